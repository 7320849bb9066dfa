use crate::args::MissingArgs;
use crate::report::print_missing;
use anyhow::Result;
use cask_core::drv::DrvPathWithOutputs;
use cask_store::missing::query_missing;
use cask_store::stores::local::LocalStore;
use std::collections::BTreeSet;

pub async fn missing_cli(args: MissingArgs) -> Result<()> {
    let mut targets = BTreeSet::new();
    for t in &args.targets {
        targets.insert(DrvPathWithOutputs::parse(t)?);
    }

    let store = LocalStore::new().await?;
    let missing = query_missing(&store, &targets).await?;
    print_missing(&missing);
    Ok(())
}
