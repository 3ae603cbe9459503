//! CLI entry-point for printing the ranked candidates.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{instrument, warn};

use crate::{
    cli::REPORT_FILE,
    config::Settings,
    signals::{report, SignalCandidate},
};

#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Rows to print.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    /// Only print candidates ranked at least this far ahead of their count rank.
    #[arg(long)]
    pub early_only: bool,
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn format_row(c: &SignalCandidate) -> String {
    format!(
        "{:>4} {:>5} {:<24} {:<28} {:>6} {:>7.3} {:>8} {:>8} {:>8} {:>3}",
        c.quantum_rank,
        c.classical_rank,
        c.drug,
        c.reaction,
        c.count,
        c.quantum.score,
        fmt_opt(c.statistics.prr.map(|e| e.value)),
        fmt_opt(c.statistics.ror.map(|e| e.value)),
        fmt_opt(c.statistics.ebgm.map(|e| e.ebgm)),
        if c.detected_early { "*" } else { "" },
    )
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = settings.join_output(REPORT_FILE);
    if !path.exists() {
        warn!(path = %path.display(), "no saved report; run `signal` first");
        return Ok(());
    }
    let saved = report::read_json(&path)?;
    println!(
        "{:>4} {:>5} {:<24} {:<28} {:>6} {:>7} {:>8} {:>8} {:>8} {:>3}",
        "rank", "count", "drug", "reaction", "n", "score", "prr", "ror", "ebgm", "early"
    );
    saved
        .candidates
        .iter()
        .filter(|c| !args.early_only || c.detected_early)
        .take(args.limit)
        .for_each(|c| println!("{}", format_row(c)));
    Ok(())
}
