//! CLI entry-point for printing alerts from the saved report.

use anyhow::Result;
use clap::{Args as ClapArgs, ValueEnum};
use tracing::{instrument, warn};

use crate::{
    cli::REPORT_FILE,
    config::Settings,
    signals::{
        alert::{AlertKind, Severity},
        report,
    },
};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindFilter {
    Spike,
    Emerging,
    Subgroup,
}

impl KindFilter {
    pub fn matches(self, kind: AlertKind) -> bool {
        matches!(
            (self, kind),
            (Self::Spike, AlertKind::Spike)
                | (Self::Emerging, AlertKind::Emerging)
                | (Self::Subgroup, AlertKind::SubgroupAnomaly)
        )
    }
}

#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Restrict to one alert kind.
    #[arg(long, value_enum)]
    pub kind: Option<KindFilter>,
    /// Hide alerts below this severity.
    #[arg(long, value_enum, default_value = "low")]
    pub min_severity: SeverityArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SeverityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = settings.join_output(REPORT_FILE);
    if !path.exists() {
        warn!(path = %path.display(), "no saved report; run `signal` first");
        return Ok(());
    }
    let saved = report::read_json(&path)?;
    let floor = Severity::from(args.min_severity);
    let mut alerts: Vec<_> = saved
        .alerts()
        .filter(|alert| args.kind.map_or(true, |kind| kind.matches(alert.kind)))
        .filter(|alert| alert.severity >= floor)
        .collect();
    alerts.sort_by(|x, y| y.severity.cmp(&x.severity));
    for alert in &alerts {
        println!("[{:?}] {:?}: {}", alert.severity, alert.kind, alert.summary);
    }
    if alerts.is_empty() {
        println!("no alerts");
    }
    Ok(())
}
