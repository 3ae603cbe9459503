//! Command-line interface wiring for signal-ranker.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod alerts;
pub mod rank;
pub mod serve;
pub mod signal;

/// File names written under the outputs directory.
pub const REPORT_FILE: &str = "signals.json";
pub const RANKED_FILE: &str = "signals.csv";

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Pharmacovigilance signal detection and ranking", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Signal(args) => signal::run(args, settings).await,
            Commands::Rank(args) => rank::run(args, settings).await,
            Commands::Alerts(args) => alerts::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a case table, score every drug-reaction pair and save the report.
    Signal(signal::Args),
    /// Print the ranked candidates from the saved report.
    Rank(rank::Args),
    /// Print trend and subgroup alerts from the saved report.
    Alerts(alerts::Args),
    /// Serve the saved report as a JSON API.
    Serve(serve::Args),
}
