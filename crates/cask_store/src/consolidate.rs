use crate::api::{AddOpt, Store};
use crate::closure::compute_closure;
use crate::rewrite::HashRewrites;
use anyhow::{anyhow, ensure, Result};
use cask_core::error::Error;
use cask_core::store::StorePath;
use cask_core::types::{is_trusted, EqClass, TrustId};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

pub type ClassMap = BTreeMap<EqClass, BTreeSet<StorePath>>;
pub type FinalClassMap = BTreeMap<EqClass, StorePath>;

/// Original path to its chosen replacement, memoized across one pass.
pub type Replacements = BTreeMap<StorePath, StorePath>;

/// The members of `eq_class` vouched for by a principal that `trust_id`
/// trusts, i.e. by `trust_id` itself or by root.
pub async fn find_trusted_eq_members<S>(
    store: &S,
    eq_class: &EqClass,
    trust_id: &TrustId,
) -> Result<BTreeSet<StorePath>>
where
    S: Store,
{
    Ok(store
        .query_eq_members(eq_class)
        .await?
        .into_iter()
        .filter(|m| is_trusted(&m.trust_id, trust_id))
        .map(|m| m.path)
        .collect())
}

pub async fn find_trusted_eq_member<S>(
    store: &S,
    eq_class: &EqClass,
    trust_id: &TrustId,
) -> Result<StorePath>
where
    S: Store,
{
    match find_trusted_eq_members(store, eq_class, trust_id)
        .await?
        .into_iter()
        .next()
    {
        Some(path) => Ok(path),
        None => Err(Error::NoClassMember(eq_class.clone()).into()),
    }
}

/// Reduce `paths` to a closure holding at most one member per output
/// equivalence class, rewriting the chosen representatives so their
/// references stay inside the result. Returns the new closure together
/// with the replacement mapping. With `check_only` a detected conflict is
/// an error instead.
///
/// New equivalence members produced by rewriting are stamped with
/// `trust_id`.
pub async fn consolidate_paths<S>(
    store: &S,
    paths: &BTreeSet<StorePath>,
    check_only: bool,
    trust_id: &TrustId,
) -> Result<(BTreeSet<StorePath>, Replacements)>
where
    S: Store,
{
    debug!("consolidating {} paths", paths.len());

    let mut class_map = ClassMap::new();
    let mut sources = BTreeSet::new();

    for p in paths {
        let classes = store.query_eq_classes(p).await?;
        if classes.is_empty() {
            sources.insert(p.clone());
        } else {
            for c in classes {
                class_map.entry(c).or_default().insert(p.clone());
            }
        }
    }

    debug!("found {} sources", sources.len());

    let mut conflict = None;
    for (c, members) in &class_map {
        if members.len() >= 2 {
            info!("conflict in equivalence class `{c}'");
            conflict.get_or_insert_with(|| c.clone());
        }
    }

    let Some(conflict) = conflict else {
        return Ok((paths.clone(), Replacements::new()));
    };

    if check_only {
        return Err(Error::Conflict(conflict).into());
    }

    // Picking which member survives in each class is the hard part: some
    // selections need fewer rewrites than others. This tries all of them
    // and keeps the cheapest.
    // TODO: exponential; a worst-case polynomial selection is an open problem
    let members: Vec<&BTreeSet<StorePath>> = class_map.values().collect();
    let mut best_cost = usize::MAX;
    let mut best_selection = BTreeSet::new();
    find_best_rewrite(
        store,
        &members,
        &BTreeSet::new(),
        &BTreeSet::new(),
        &mut best_cost,
        &mut best_selection,
    )
    .await?;
    ensure!(best_cost != usize::MAX, "no selection found");

    info!("cheapest selection needs {best_cost} rewrites");

    let mut final_class_map = FinalClassMap::new();
    for (c, members) in &class_map {
        for m in members {
            if best_selection.contains(m) {
                final_class_map.insert(c.clone(), m.clone());
            }
        }
    }

    let mut new_paths = BTreeSet::new();
    let mut replacements = Replacements::new();
    let mut nr_rewrites = 0;
    for p in &best_selection {
        let new_path = maybe_rewrite(
            store,
            p,
            &best_selection,
            &final_class_map,
            &sources,
            &mut replacements,
            &mut nr_rewrites,
            trust_id,
        )
        .await?;
        new_paths.insert(new_path);
    }
    new_paths.extend(sources.iter().cloned());

    ensure!(
        nr_rewrites == best_cost,
        "rewrite count {nr_rewrites} does not match selection cost {best_cost}"
    );
    ensure!(
        new_paths.len() < paths.len(),
        "consolidation did not shrink the closure"
    );

    Ok((new_paths, replacements))
}

/// Enumerate one representative per class; the cost of a full selection is
/// the number of selected paths whose closure still reaches an unselected
/// member of some class. Strictly-smaller comparison keeps the first
/// minimum in enumeration order, which is the byte-lexicographic order of
/// classes and of members within a class.
async fn find_best_rewrite<S>(
    store: &S,
    classes: &[&BTreeSet<StorePath>],
    selection: &BTreeSet<StorePath>,
    unselection: &BTreeSet<StorePath>,
    best_cost: &mut usize,
    best_selection: &mut BTreeSet<StorePath>,
) -> Result<()>
where
    S: Store,
{
    if let Some((members, rest)) = classes.split_first() {
        for i in *members {
            let mut selection2 = selection.clone();
            selection2.insert(i.clone());

            let mut unselection2 = unselection.clone();
            for j in *members {
                if i != j {
                    unselection2.insert(j.clone());
                }
            }

            Box::pin(find_best_rewrite(
                store,
                rest,
                &selection2,
                &unselection2,
                best_cost,
                best_selection,
            ))
            .await?;
        }
        return Ok(());
    }

    let mut bad_paths = BTreeSet::new();
    for i in selection {
        let mut closure = BTreeSet::new();
        compute_closure(store, i, &mut closure).await?;
        if closure.iter().any(|j| unselection.contains(j)) {
            bad_paths.insert(i.clone());
        }
    }

    if bad_paths.len() < *best_cost {
        *best_cost = bad_paths.len();
        *best_selection = selection.clone();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn maybe_rewrite<S>(
    store: &S,
    path: &StorePath,
    selection: &BTreeSet<StorePath>,
    final_class_map: &FinalClassMap,
    sources: &BTreeSet<StorePath>,
    replacements: &mut Replacements,
    nr_rewrites: &mut usize,
    trust_id: &TrustId,
) -> Result<StorePath>
where
    S: Store,
{
    debug!("considering rewriting `{path}'");
    ensure!(
        selection.contains(path),
        "`{path}' is not part of the selection"
    );

    if let Some(replacement) = replacements.get(path) {
        return Ok(replacement.clone());
    }

    let references = store.query_references(path).await?;

    let mut rewrites = HashRewrites::new();
    let mut new_references = BTreeSet::new();

    for r in &references {
        // sources are outside the rewrite universe; self references are
        // finalized by the store itself
        if r == path || sources.contains(r) {
            new_references.insert(r.clone());
            continue;
        }

        let classes = store.query_eq_classes(r).await?;
        let class = classes
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnknownClass(r.clone()))?;
        let chosen = final_class_map
            .get(&class)
            .ok_or_else(|| anyhow!("no representative chosen for class `{class}'"))?
            .clone();

        let new_path = Box::pin(maybe_rewrite(
            store,
            &chosen,
            selection,
            final_class_map,
            sources,
            replacements,
            nr_rewrites,
            trust_id,
        ))
        .await?;

        if *r != new_path {
            rewrites.insert(r.hash_part(), new_path.hash_part());
        }
        new_references.insert(new_path);
    }

    // nothing reachable from here changed
    if rewrites.is_empty() {
        replacements.insert(path.clone(), path.clone());
        return Ok(path.clone());
    }

    info!("rewriting `{path}'");

    let new_path = store
        .add_to_store(
            path,
            AddOpt {
                expected_hash: path.hash_part(),
                name: path.name_part().to_string(),
                refs: new_references,
                rewrites,
            },
        )
        .await?;

    // we don't know which class this rewrite originated from, so the new
    // member is recorded in every class the old path belongs to
    let classes = store.query_eq_classes(path).await?;
    for c in classes {
        store.add_eq_member(&c, trust_id, &new_path).await?;
    }

    *nr_rewrites += 1;

    info!("rewrote `{path}' to `{new_path}'");

    replacements.insert(path.clone(), new_path.clone());
    Ok(new_path)
}
