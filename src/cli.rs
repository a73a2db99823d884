use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prismctl")]
#[command(about = "Batch and clone orchestration for Prism clusters", long_about = None)]
pub struct Cli {
    /// Configuration file (overrides PRISMCTL_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List VMs by name, or print the id of one
    Resolve(ResolveArgs),
    /// Submit a batch document and report per-item outcomes
    Batch(BatchArgs),
    /// Clone a source VM once per name
    Clone(CloneArgs),
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Only print the id of this VM
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// JSON document holding a `batch_details` object
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct CloneArgs {
    /// Name of the VM to clone
    #[arg(long)]
    pub source: String,

    /// Name of a clone to create (repeatable)
    #[arg(long = "name", required = true)]
    pub names: Vec<String>,

    /// Network id attached to every clone
    #[arg(long)]
    pub network: String,

    /// Overrides clone.max_concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
}
