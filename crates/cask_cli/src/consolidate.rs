use crate::args::ConsolidateArgs;
use crate::trust::current_trust_id;
use anyhow::Result;
use cask_core::store::StorePath;
use cask_store::api::Store;
use cask_store::consolidate::consolidate_paths;
use cask_store::stores::local::LocalStore;
use log::info;
use std::collections::BTreeSet;

pub async fn consolidate_cli(args: ConsolidateArgs) -> Result<()> {
    let mut paths = BTreeSet::new();
    for p in &args.paths {
        paths.insert(StorePath::parse(p)?);
    }

    let trust_id = current_trust_id()?;
    info!("trust ID is `{trust_id}'");

    let store = LocalStore::new().await?;
    let (closure, replacements) = consolidate_paths(&store, &paths, args.check, &trust_id).await?;

    for (from, to) in &replacements {
        if from != to {
            println!("{from} -> {to}");
        }
    }
    for p in &closure {
        println!("{}", store.store_path(p));
    }
    Ok(())
}
