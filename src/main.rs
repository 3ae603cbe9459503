//! `signal-ranker` binary.

use anyhow::Result;
use signal_ranker::{cli::Cli, config::Settings, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let cli = Cli::parse();
    let settings = Settings::load()?;

    info!(version = env!("CARGO_PKG_VERSION"), ?cli, "signal-ranker starting");
    cli.dispatch(settings).await
}
