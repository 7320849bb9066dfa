use crate::api::Store;
use anyhow::Result;
use cask_core::error::Error;
use cask_core::store::StorePath;
use std::collections::BTreeSet;

/// Order `paths` so that every path comes after the paths it references,
/// following only edges whose head also lies in the set. Self references
/// are ignored; a reference cycle is an error.
pub async fn topo_sort_paths<S>(store: &S, paths: &BTreeSet<StorePath>) -> Result<Vec<StorePath>>
where
    S: Store,
{
    let mut sorted = Vec::new();
    let mut visited = BTreeSet::new();
    let mut parents = BTreeSet::new();
    for path in paths {
        dfs_visit(store, paths, path, &mut visited, &mut sorted, &mut parents).await?;
    }
    Ok(sorted)
}

async fn dfs_visit<S>(
    store: &S,
    paths: &BTreeSet<StorePath>,
    path: &StorePath,
    visited: &mut BTreeSet<StorePath>,
    sorted: &mut Vec<StorePath>,
    parents: &mut BTreeSet<StorePath>,
) -> Result<()>
where
    S: Store,
{
    if parents.contains(path) {
        return Err(Error::Cycle(path.clone()).into());
    }
    if visited.contains(path) {
        return Ok(());
    }
    visited.insert(path.clone());
    parents.insert(path.clone());

    // don't traverse into paths that don't exist; that can happen
    // due to substitutes for non-existent paths
    let references = if store.is_valid_path(path).await? {
        store.query_references(path).await?
    } else {
        BTreeSet::new()
    };

    for r in &references {
        if r != path && paths.contains(r) {
            Box::pin(dfs_visit(store, paths, r, visited, sorted, parents)).await?;
        }
    }

    sorted.push(path.clone());
    parents.remove(path);
    Ok(())
}
