use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Show what would be built or fetched for the given targets
    Missing(MissingArgs),
    /// Print the given paths in reference order, leaves first
    Topo(TopoArgs),
    /// Reduce the given paths to one member per output equivalence class
    Consolidate(ConsolidateArgs),
}

#[derive(ClapArgs, Clone, Debug)]
pub struct MissingArgs {
    /// Store paths, or derivations with outputs as `<path>!out1,out2`
    pub targets: Vec<String>,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct TopoArgs {
    pub paths: Vec<String>,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ConsolidateArgs {
    /// Fail when a conflict is found instead of rewriting
    #[arg(long)]
    pub check: bool,
    pub paths: Vec<String>,
}
