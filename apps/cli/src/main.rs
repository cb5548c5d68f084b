//! MultiLookup CLI: run multi-operation lookup enrichment over record files.
//!
//! Validates processor configurations and routes each input file into
//! enriched, not-enriched, original, and failure outputs.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
