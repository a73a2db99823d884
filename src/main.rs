mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use prismctl::config::Config;
use prismctl::observability;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing("info");

    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    let code = match cli.command {
        Commands::Resolve(args) => commands::resolve(&config, args).await?,
        Commands::Batch(args) => commands::batch(&config, args).await?,
        Commands::Clone(args) => commands::clone(&config, args).await?,
        Commands::Config => commands::show_config(&config)?,
    };

    Ok(code)
}
