mod args;
mod consolidate;
mod logger;
mod missing;
mod report;
mod topo;
mod trust;

use anyhow::Result;
use args::{Args, Command};
use clap::Parser;
use consolidate::consolidate_cli;
use log::LevelFilter;
use logger::Logger;
use missing::missing_cli;
use topo::topo_cli;

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { cli().await })
}

fn setup_logging() {
    if log::set_logger(&Logger).is_err() {
        eprintln!("Unable to set logger, proceeding without one");
    } else {
        log::set_max_level(LevelFilter::Debug);
    }
}

async fn cli() -> Result<()> {
    let args = Args::parse();
    if args.verbose {
        setup_logging();
    }
    match args.command {
        Command::Missing(args) => missing_cli(args).await,
        Command::Topo(args) => topo_cli(args).await,
        Command::Consolidate(args) => consolidate_cli(args).await,
    }
}
