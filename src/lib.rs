//! tourguide
//!
//! Composition root: configuration, tracing and adapter wiring for the tour
//! engine, plus the command-line front end.

pub mod bootstrap;
pub mod cli;

use clap::Parser;

/// Parse arguments, initialize tracing and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let log_dir = tg_infra::app_data_dir().ok().map(|dir| dir.join("logs"));
    bootstrap::init_tracing_subscriber(cli.verbose, log_dir.as_deref())?;

    cli::execute(cli).await
}
