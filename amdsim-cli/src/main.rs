//! ## amdsim
//! **Command line front end of the treat-and-extend simulator**
//!
//! Loads protocol documents, runs the agent or event engine, and writes
//! results and audit trails as JSON.

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::init_logging(cli.json_logs)?;
    commands::run_command(cli).await
}
