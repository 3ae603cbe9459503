//! Runtime configuration utilities for signal-ranker.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{EngineError, Result},
    signals::weights::ComponentWeights,
};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root folder for input case tables.
    pub data_dir: PathBuf,
    /// Root folder for analytic outputs.
    pub outputs_dir: PathBuf,
    /// Optional JSON file holding an [`EngineConfig`].
    pub engine_config: Option<PathBuf>,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let engine_config = env::var("ENGINE_CONFIG").ok().map(PathBuf::from);

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
            engine_config,
        })
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

/// Time bucket used for spike detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    #[default]
    Month,
    Quarter,
}

impl FromStr for TrendPeriod {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            other => Err(EngineError::ConfigurationInvalid(format!(
                "unknown trend period `{other}`"
            ))),
        }
    }
}

/// Options recognised by the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranked candidates returned per run.
    pub top_n: usize,
    /// Standard deviations above the baseline mean that count as a spike.
    pub z_threshold: f64,
    /// Minimum current-period count before a spike can be flagged.
    pub min_spike_floor: u64,
    /// Minimum post-cutoff count for an emerging pair.
    pub emerging_min_count: u64,
    /// Days before the reference date that separate "prior" from "recent".
    pub emerging_lookback_days: i64,
    /// Top-to-second bucket ratio above which a subgroup is flagged.
    pub subgroup_anomaly_threshold: f64,
    pub component_weights: ComponentWeights,
    pub trend_period: TrendPeriod,
    /// Non-current periods required before a baseline is trusted.
    pub min_baseline_periods: usize,
    pub min_trend_cases: u64,
    pub min_subgroup_cases: u64,
    /// Classical-minus-quantum rank gap that marks a candidate as detected early.
    pub early_detection_gap: i64,
    /// Date that recency and trend windows are measured from. Defaults to the
    /// latest event date in the snapshot.
    pub reference_date: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: 50,
            z_threshold: 2.0,
            min_spike_floor: 3,
            emerging_min_count: 3,
            emerging_lookback_days: 90,
            subgroup_anomaly_threshold: 2.0,
            component_weights: ComponentWeights::default(),
            trend_period: TrendPeriod::Month,
            min_baseline_periods: 2,
            min_trend_cases: 3,
            min_subgroup_cases: 3,
            early_detection_gap: 10,
            reference_date: None,
        }
    }
}

/// Longest emerging-signal lookback accepted, roughly a century.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| EngineError::ConfigurationInvalid(format!("{key}=`{raw}`: {err}"))),
        Err(_) => Ok(None),
    }
}

impl EngineConfig {
    /// Read a JSON config file; unspecified fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            EngineError::ConfigurationInvalid(format!("reading {}: {err}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|err| {
            EngineError::ConfigurationInvalid(format!("parsing {}: {err}", path.display()))
        })
    }

    /// Resolve configuration: optional JSON file, then environment overrides, then validation.
    pub fn resolve(settings: &Settings) -> Result<Self> {
        let base = match &settings.engine_config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        debug!(?config, "resolved engine configuration");
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_parse("TOP_N")? {
            self.top_n = v;
        }
        if let Some(v) = env_parse("Z_THRESHOLD")? {
            self.z_threshold = v;
        }
        if let Some(v) = env_parse("MIN_SPIKE_FLOOR")? {
            self.min_spike_floor = v;
        }
        if let Some(v) = env_parse("EMERGING_MIN_COUNT")? {
            self.emerging_min_count = v;
        }
        if let Some(v) = env_parse("EMERGING_LOOKBACK_DAYS")? {
            self.emerging_lookback_days = v;
        }
        if let Some(v) = env_parse("SUBGROUP_ANOMALY_THRESHOLD")? {
            self.subgroup_anomaly_threshold = v;
        }
        if let Some(v) = env_parse::<TrendPeriod>("TREND_PERIOD")? {
            self.trend_period = v;
        }
        if let Some(v) = env_parse::<NaiveDate>("REFERENCE_DATE")? {
            self.reference_date = Some(v);
        }
        if let Ok(raw) = env::var("COMPONENT_WEIGHTS") {
            self.component_weights = ComponentWeights::parse_list(&raw)?;
        }
        Ok(self)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.component_weights.validate()?;
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::ConfigurationInvalid(format!(
                    "{name} must be a positive number, got {value}"
                )))
            }
        };
        positive("z_threshold", self.z_threshold)?;
        positive("subgroup_anomaly_threshold", self.subgroup_anomaly_threshold)?;
        if self.top_n == 0 {
            return Err(EngineError::ConfigurationInvalid(
                "top_n must be at least 1".into(),
            ));
        }
        if self.emerging_min_count == 0 {
            return Err(EngineError::ConfigurationInvalid(
                "emerging_min_count must be at least 1".into(),
            ));
        }
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.emerging_lookback_days) {
            return Err(EngineError::ConfigurationInvalid(format!(
                "emerging_lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.emerging_lookback_days
            )));
        }
        if self.early_detection_gap < 1 {
            return Err(EngineError::ConfigurationInvalid(format!(
                "early_detection_gap must be at least 1, got {}",
                self.early_detection_gap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_thresholds_are_rejected() {
        let config = EngineConfig {
            z_threshold: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"top_n": 10, "trend_period": "quarter"}"#).unwrap();
        assert_eq!(config.top_n, 10);
        assert_eq!(config.trend_period, TrendPeriod::Quarter);
        assert_eq!(config.emerging_min_count, 3);
    }
}
