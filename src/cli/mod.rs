//! Command-line surface.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;

#[derive(Parser, Debug)]
#[command(name = "tourguide")]
#[command(about = "Guided product tours over a headless dashboard view", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tours and onboarding paths
    Catalog,
    /// Print a user's reconciled onboarding state as JSON
    Status {
        #[arg(short, long)]
        user: String,
    },
    /// Walk a tour against a view snapshot, printing each step as JSON
    Run {
        #[arg(short, long)]
        user: String,
        /// Start this tour from step 0
        #[arg(long, conflicts_with = "path")]
        tour: Option<String>,
        /// Select this onboarding path and start its tour
        #[arg(long)]
        path: Option<String>,
        /// JSON view snapshot to run against
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Stop after showing this many steps, leaving the tour resumable
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Reset a user's onboarding state on every device
    Reset {
        #[arg(short, long)]
        user: String,
    },
}
