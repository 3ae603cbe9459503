//! CLI entry-point for the read-only HTTP API.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{api, config::Settings};

#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Serve the report found in this directory instead of OUTPUTS_DIR.
    #[arg(long)]
    pub outputs_dir: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    if let Some(dir) = args.outputs_dir {
        settings.outputs_dir = dir;
    }
    api::serve(settings, &args.host, args.port).await
}
