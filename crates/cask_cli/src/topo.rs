use crate::args::TopoArgs;
use anyhow::Result;
use cask_core::store::StorePath;
use cask_store::api::Store;
use cask_store::stores::local::LocalStore;
use cask_store::topo::topo_sort_paths;
use std::collections::BTreeSet;

pub async fn topo_cli(args: TopoArgs) -> Result<()> {
    let mut paths = BTreeSet::new();
    for p in &args.paths {
        paths.insert(StorePath::parse(p)?);
    }

    let store = LocalStore::new().await?;
    for p in topo_sort_paths(&store, &paths).await? {
        println!("{}", store.store_path(&p));
    }
    Ok(())
}
