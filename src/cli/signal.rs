//! CLI entry-point for computing a signal report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    cli::{RANKED_FILE, REPORT_FILE},
    config::{EngineConfig, Settings},
    data::{cases::CaseStore, loader::load_case_table},
    signals::{report, AnalysisReport, SignalEngine},
};

#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Case table (CSV or Parquet). Defaults to `cases.csv` under DATA_DIR.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// JSON engine configuration; overrides ENGINE_CONFIG.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of ranked candidates to keep.
    #[arg(long)]
    pub top_n: Option<usize>,
    /// Date recency and trend windows are measured from (YYYY-MM-DD).
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,
}

fn engine_config(args: &Args, settings: &Settings) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?.with_env_overrides()?,
        None => EngineConfig::resolve(settings)?,
    };
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    if args.reference_date.is_some() {
        config.reference_date = args.reference_date;
    }
    config.validate()?;
    Ok(config)
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let config = engine_config(&args, &settings)?;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| settings.join_data("cases.csv"));

    let report = tokio::task::spawn_blocking(move || -> Result<AnalysisReport> {
        let store = CaseStore::new();
        let table = load_case_table(&input, store.allocate_version())
            .with_context(|| format!("loading {}", input.display()))?;
        store.install(table);
        let engine = SignalEngine::new(store.current(), config)?;
        Ok(engine.run(engine.version())?)
    })
    .await??;

    report::write_json(&report, &settings.join_output(REPORT_FILE))?;
    report::write_csv(&report.candidates, &settings.join_output(RANKED_FILE))?;
    info!(
        version = %report.dataset_version,
        cases = report.total_cases,
        candidates = report.total_candidates,
        alerts = report.alerts().count(),
        "signal report saved"
    );
    Ok(())
}
