use crate::api::{Store, CONFIG};
use anyhow::Result;
use cask_core::drv::{is_derivation, must_build_locally, want_output, DrvPathWithOutputs};
use cask_core::store::StorePath;
use std::collections::BTreeSet;

/// The plan for a set of requested targets: what has to be built, what can
/// be fetched from a substituter, and what we cannot produce at all.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Missing {
    pub will_build: BTreeSet<StorePath>,
    pub will_substitute: BTreeSet<StorePath>,
    pub unknown: BTreeSet<StorePath>,
    pub download_size: u64,
    pub nar_size: u64,
}

/// Partition `targets` into build/substitute/unknown.
///
/// Substitute queries have high latency when they go through a binary
/// cache, so each round collects every path it needs info about and asks
/// the store once; the substituter may fan out internally.
pub async fn query_missing<S>(
    store: &S,
    targets: &BTreeSet<DrvPathWithOutputs>,
) -> Result<Missing>
where
    S: Store,
{
    let use_substitutes = CONFIG.use_substitutes;

    let mut missing = Missing::default();
    let mut todo = targets.clone();
    let mut done: BTreeSet<String> = BTreeSet::new();

    while !todo.is_empty() {
        let mut query = BTreeSet::new();
        let mut todo_drv = Vec::new();
        let mut todo_non_drv = Vec::new();

        for target in std::mem::take(&mut todo) {
            if !done.insert(target.to_string()) {
                continue;
            }

            if is_derivation(&target.path) {
                if !store.is_valid_path(&target.path).await? {
                    // no attempt is made to substitute the derivation itself
                    missing.unknown.insert(target.path);
                    continue;
                }
                let drv = store.read_derivation(&target.path).await?;

                let mut invalid = BTreeSet::new();
                for (out, o) in &drv.outputs {
                    if want_output(out, &target.outputs)
                        && !store.is_valid_path(&o.path).await?
                    {
                        invalid.insert(o.path.clone());
                    }
                }
                if invalid.is_empty() {
                    continue;
                }

                if use_substitutes && !must_build_locally(&drv) {
                    query.extend(invalid);
                }
                todo_drv.push(target);
            } else {
                if store.is_valid_path(&target.path).await? {
                    continue;
                }
                query.insert(target.path.clone());
                todo_non_drv.push(target.path);
            }
        }

        let infos = store.query_substitutable_path_infos(&query).await?;

        for target in todo_drv {
            let drv = store.read_derivation(&target.path).await?;

            let mut outputs = BTreeSet::new();
            let mut must_build = false;
            if use_substitutes && !must_build_locally(&drv) {
                for (out, o) in &drv.outputs {
                    if !want_output(out, &target.outputs) {
                        continue;
                    }
                    if !store.is_valid_path(&o.path).await? {
                        if infos.contains_key(&o.path) {
                            outputs.insert(o.path.clone());
                        } else {
                            must_build = true;
                        }
                    }
                }
            } else {
                must_build = true;
            }

            if must_build {
                missing.will_build.insert(target.path.clone());
                todo.extend(
                    drv.input_srcs
                        .iter()
                        .cloned()
                        .map(DrvPathWithOutputs::plain),
                );
                for (drv_path, outs) in &drv.input_drvs {
                    todo.insert(DrvPathWithOutputs {
                        path: drv_path.clone(),
                        outputs: outs.iter().cloned().collect(),
                    });
                }
            } else {
                todo_non_drv.extend(outputs);
            }
        }

        for p in todo_non_drv {
            done.insert(p.to_string());
            if let Some(info) = infos.get(&p) {
                missing.will_substitute.insert(p.clone());
                missing.download_size += info.download_size;
                missing.nar_size += info.nar_size;
                todo.extend(
                    info.references
                        .iter()
                        .cloned()
                        .map(DrvPathWithOutputs::plain),
                );
            } else {
                missing.unknown.insert(p);
            }
        }
    }

    Ok(missing)
}
