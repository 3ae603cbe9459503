//! Persistence of analysis reports: full JSON plus a flat ranked CSV.

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, NamedFrom, SerWriter, Series};
use tracing::info;

use crate::signals::{AnalysisReport, SignalCandidate};

pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    info!(path = %path.display(), candidates = report.candidates.len(), "wrote signal report");
    Ok(())
}

pub fn read_json(path: &Path) -> Result<AnalysisReport> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let report = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(report)
}

fn column<T>(
    name: &str,
    rows: &[SignalCandidate],
    f: impl Fn(&SignalCandidate) -> T,
) -> Series
where
    Series: NamedFrom<Vec<T>, [T]>,
{
    Series::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

/// Flat table of the ranked candidates, one row per pair.
pub fn ranked_frame(candidates: &[SignalCandidate]) -> Result<DataFrame> {
    let rows = candidates;
    let df = DataFrame::new(vec![
        column("quantum_rank", rows, |c| c.quantum_rank as u64),
        column("classical_rank", rows, |c| c.classical_rank as u64),
        column("drug", rows, |c| c.drug.clone()),
        column("reaction", rows, |c| c.reaction.clone()),
        column("count", rows, |c| c.count),
        column("quantum_score", rows, |c| c.quantum.score),
        column("rarity", rows, |c| c.quantum.weighted.rarity),
        column("seriousness", rows, |c| c.quantum.weighted.seriousness),
        column("recency", rows, |c| c.quantum.weighted.recency),
        column("count_sufficiency", rows, |c| c.quantum.weighted.count),
        column("bonuses", rows, |c| {
            c.quantum
                .bonuses
                .iter()
                .map(|bonus| format!("{:?}", bonus.kind))
                .collect::<Vec<_>>()
                .join(";")
        }),
        column("prr", rows, |c| c.statistics.prr.map(|e| e.value)),
        column("prr_ci_low", rows, |c| c.statistics.prr.map(|e| e.ci_low)),
        column("prr_ci_high", rows, |c| c.statistics.prr.map(|e| e.ci_high)),
        column("ror", rows, |c| c.statistics.ror.map(|e| e.value)),
        column("ror_ci_low", rows, |c| c.statistics.ror.map(|e| e.ci_low)),
        column("ror_ci_high", rows, |c| c.statistics.ror.map(|e| e.ci_high)),
        column("ebgm", rows, |c| c.statistics.ebgm.map(|e| e.ebgm)),
        column("eb05", rows, |c| c.statistics.ebgm.map(|e| e.eb05)),
        column("eb95", rows, |c| c.statistics.ebgm.map(|e| e.eb95)),
        column("ic", rows, |c| c.statistics.ic.map(|e| e.ic)),
        column("ic025", rows, |c| c.statistics.ic.map(|e| e.ic025)),
        column("ic975", rows, |c| c.statistics.ic.map(|e| e.ic975)),
        column("bcpnn", rows, |c| c.statistics.bcpnn.map(|e| e.ic)),
        column("chi_squared", rows, |c| {
            c.statistics.chi_squared.map(|chi| chi.statistic)
        }),
        column("chi_squared_p", rows, |c| {
            c.statistics.chi_squared.map(|chi| chi.p_value)
        }),
        column("fisher_p", rows, |c| c.statistics.fisher_p),
        column("p_value", rows, |c| c.statistics.preferred_p_value()),
        column("classical_signal", rows, |c| c.classical_signal),
        column("detected_early", rows, |c| c.detected_early),
        column("alerts", rows, |c| c.alerts.len() as u64),
    ])?;
    Ok(df)
}

pub fn write_csv(candidates: &[SignalCandidate], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut df = ranked_frame(candidates)?;
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    info!(path = %path.display(), rows = df.height(), "wrote ranked signals");
    Ok(())
}
