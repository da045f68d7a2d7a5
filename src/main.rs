mod cli;
mod core;
mod fixers;
mod migrations;
mod templates;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Update(args) => {
            cli::commands::update::execute(args)?;
        }
        Commands::Init(args) => {
            cli::commands::init::execute(args)?;
        }
    }

    Ok(())
}
