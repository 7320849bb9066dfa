use crate::api::Store;
use anyhow::Result;
use cask_core::drv::is_derivation;
use cask_core::store::StorePath;
use std::collections::BTreeSet;

/// Accumulate the closure of `path` under the plain reference relation.
pub async fn compute_closure<S>(
    store: &S,
    path: &StorePath,
    out: &mut BTreeSet<StorePath>,
) -> Result<()>
where
    S: Store,
{
    compute_fs_closure(store, path, out, false, false, false).await
}

/// Transitive reference walk, accumulating into `out` (never cleared).
/// `flip_direction` walks referrers instead of references. `include_outputs`
/// pulls in the valid outputs of traversed derivations (or, flipped, the
/// valid derivers of traversed paths). `include_derivers` pulls in the
/// recorded deriver of each path (or, flipped, the outputs a derivation is
/// the recorded deriver of).
pub async fn compute_fs_closure<S>(
    store: &S,
    path: &StorePath,
    out: &mut BTreeSet<StorePath>,
    flip_direction: bool,
    include_outputs: bool,
    include_derivers: bool,
) -> Result<()>
where
    S: Store,
{
    if out.contains(path) {
        return Ok(());
    }
    out.insert(path.clone());

    let mut edges = BTreeSet::new();

    if flip_direction {
        edges.extend(store.query_referrers(path).await?);

        if include_outputs {
            edges.extend(store.query_valid_derivers(path).await?);
        }

        if include_derivers && is_derivation(path) {
            for o in store.query_derivation_outputs(path).await? {
                if store.is_valid_path(&o).await?
                    && store.query_deriver(&o).await?.as_ref() == Some(path)
                {
                    edges.insert(o);
                }
            }
        }
    } else {
        edges.extend(store.query_references(path).await?);

        if include_outputs && is_derivation(path) {
            for o in store.query_derivation_outputs(path).await? {
                if store.is_valid_path(&o).await? {
                    edges.insert(o);
                }
            }
        }

        if include_derivers {
            if let Some(deriver) = store.query_deriver(path).await? {
                if store.is_valid_path(&deriver).await? {
                    edges.insert(deriver);
                }
            }
        }
    }

    for edge in edges {
        Box::pin(compute_fs_closure(
            store,
            &edge,
            out,
            flip_direction,
            include_outputs,
            include_derivers,
        ))
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::mem::MemStore;
    use cask_core::hash::Hash;
    use cask_core::store::PathHash;

    fn path(seed: u8, name: &str) -> StorePath {
        StorePath::new(&PathHash::from_hash(&Hash::Sha256([seed; 32])), name)
    }

    #[tokio::test]
    async fn forward_closure_follows_references() {
        let store = MemStore::new();
        let (a, b, c) = (path(1, "a"), path(2, "b"), path(3, "c"));
        store.add_blob(&a, b"a", [&b]);
        store.add_blob(&b, b"b", [&c]);
        store.add_blob(&c, b"c", []);

        let mut out = BTreeSet::new();
        compute_closure(&store, &a, &mut out).await.unwrap();
        assert_eq!(out, [a, b, c].into());
    }

    #[tokio::test]
    async fn flipped_closure_follows_referrers() {
        let store = MemStore::new();
        let (a, b, c) = (path(1, "a"), path(2, "b"), path(3, "c"));
        store.add_blob(&a, b"a", [&b]);
        store.add_blob(&b, b"b", [&c]);
        store.add_blob(&c, b"c", []);

        let mut out = BTreeSet::new();
        compute_fs_closure(&store, &c, &mut out, true, false, false)
            .await
            .unwrap();
        assert_eq!(out, [a, b, c].into());
    }

    #[tokio::test]
    async fn accumulates_without_clearing() {
        let store = MemStore::new();
        let (a, b) = (path(1, "a"), path(2, "b"));
        store.add_blob(&a, b"a", []);
        store.add_blob(&b, b"b", []);

        let mut out = BTreeSet::new();
        compute_closure(&store, &a, &mut out).await.unwrap();
        compute_closure(&store, &b, &mut out).await.unwrap();
        assert_eq!(out, [a, b].into());
    }

    #[tokio::test]
    async fn cyclic_references_terminate() {
        let store = MemStore::new();
        let (a, b) = (path(1, "a"), path(2, "b"));
        store.add_blob(&a, b"a", [&b]);
        store.add_blob(&b, b"b", [&a]);

        let mut out = BTreeSet::new();
        compute_closure(&store, &a, &mut out).await.unwrap();
        assert_eq!(out, [a, b].into());
    }

    #[tokio::test]
    async fn derivation_edges() {
        let store = MemStore::new();
        let drv = path(1, "hello.drv");
        let out_path = path(2, "hello");
        store.add_blob(&drv, b"drv", []);
        store.add_blob(&out_path, b"hello", []);
        store.register_output(&drv, &out_path);

        // forward + outputs: drv pulls in its valid output
        let mut out = BTreeSet::new();
        compute_fs_closure(&store, &drv, &mut out, false, true, false)
            .await
            .unwrap();
        assert!(out.contains(&out_path));

        // forward + derivers: the output pulls in its deriver
        let mut out = BTreeSet::new();
        compute_fs_closure(&store, &out_path, &mut out, false, false, true)
            .await
            .unwrap();
        assert!(out.contains(&drv));

        // flipped + outputs: the output pulls in its valid derivers
        let mut out = BTreeSet::new();
        compute_fs_closure(&store, &out_path, &mut out, true, true, false)
            .await
            .unwrap();
        assert!(out.contains(&drv));

        // flipped + derivers: the derivation pulls in the outputs it derives
        let mut out = BTreeSet::new();
        compute_fs_closure(&store, &drv, &mut out, true, false, true)
            .await
            .unwrap();
        assert!(out.contains(&out_path));
    }
}
