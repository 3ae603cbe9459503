//! Temporal spike and emerging-pair detection over a candidate's cases.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    config::{EngineConfig, TrendPeriod},
    data::cases::CaseTable,
    signals::{Analysis, SkipReason},
};

/// A flat baseline still needs a finite z-score; its SD is floored here.
pub const MIN_BASELINE_SD: f64 = 0.5;

/// Calendar period, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    /// Month 1-12 or quarter 1-4.
    pub index: u32,
}

impl PeriodKey {
    pub fn of(date: NaiveDate, period: TrendPeriod) -> Self {
        let index = match period {
            TrendPeriod::Month => date.month(),
            TrendPeriod::Quarter => (date.month() - 1) / 3 + 1,
        };
        Self {
            year: date.year(),
            index,
        }
    }

    pub fn next(self, period: TrendPeriod) -> Self {
        let last = match period {
            TrendPeriod::Month => 12,
            TrendPeriod::Quarter => 4,
        };
        if self.index >= last {
            Self {
                year: self.year + 1,
                index: 1,
            }
        } else {
            Self {
                year: self.year,
                index: self.index + 1,
            }
        }
    }

    pub fn label(self, period: TrendPeriod) -> String {
        match period {
            TrendPeriod::Month => format!("{:04}-{:02}", self.year, self.index),
            TrendPeriod::Quarter => format!("{:04}Q{}", self.year, self.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub period: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeResult {
    pub current_period: String,
    pub current_count: u64,
    pub baseline_mean: f64,
    pub baseline_sd: f64,
    pub z_score: f64,
    pub is_spike: bool,
    /// Counts from the first reporting period up to and including the current one.
    pub history: Vec<PeriodCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergingResult {
    pub cutoff: NaiveDate,
    pub prior_count: u64,
    pub recent_count: u64,
    pub undated_count: u64,
    pub is_emerging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub spike: Analysis<SpikeResult>,
    pub emerging: Analysis<EmergingResult>,
}

/// Mean and population standard deviation.
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / values.len() as f64;
    (mean, variance.sqrt())
}

/// Bucket dated cases into contiguous periods ending at `current`.
/// Cases after the current period are ignored.
pub fn period_counts(
    dates: &[NaiveDate],
    period: TrendPeriod,
    current: PeriodKey,
) -> Vec<(PeriodKey, u64)> {
    let mut keys: Vec<PeriodKey> = dates
        .iter()
        .map(|date| PeriodKey::of(*date, period))
        .filter(|key| *key <= current)
        .collect();
    keys.sort_unstable();
    let Some(&first) = keys.first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = first;
    let mut pos = 0;
    loop {
        let mut count = 0;
        while pos < keys.len() && keys[pos] == cursor {
            count += 1;
            pos += 1;
        }
        out.push((cursor, count));
        if cursor >= current {
            break;
        }
        cursor = cursor.next(period);
    }
    out
}

/// Flag the current period when it exceeds the baseline by `z_threshold` SDs
/// and reaches the configured floor.
pub fn detect_spike(
    dates: &[NaiveDate],
    reference: NaiveDate,
    config: &EngineConfig,
) -> Analysis<SpikeResult> {
    let period = config.trend_period;
    if (dates.len() as u64) < config.min_trend_cases {
        return Analysis::Skipped(SkipReason::InsufficientCases {
            available: dates.len() as u64,
            required: config.min_trend_cases,
        });
    }
    let current = PeriodKey::of(reference, period);
    let counts = period_counts(dates, period, current);
    let Some((&(_, current_count), baseline)) = counts.split_last() else {
        return Analysis::Skipped(SkipReason::NoDatedCases);
    };
    if baseline.len() < config.min_baseline_periods {
        return Analysis::Skipped(SkipReason::InsufficientHistory {
            periods: baseline.len(),
            required: config.min_baseline_periods,
        });
    }
    let baseline_values: Vec<f64> = baseline.iter().map(|(_, count)| *count as f64).collect();
    let (baseline_mean, baseline_sd) = mean_sd(&baseline_values);
    let effective_sd = baseline_sd.max(MIN_BASELINE_SD);
    let z_score = (current_count as f64 - baseline_mean) / effective_sd;
    let is_spike = current_count as f64 > baseline_mean + config.z_threshold * effective_sd
        && current_count >= config.min_spike_floor;
    Analysis::Analyzed(SpikeResult {
        current_period: current.label(period),
        current_count,
        baseline_mean,
        baseline_sd,
        z_score,
        is_spike,
        history: counts
            .iter()
            .map(|(key, count)| PeriodCount {
                period: key.label(period),
                count: *count,
            })
            .collect(),
    })
}

/// A pair is emerging when it has no dated reports before the lookback cutoff
/// and at least `emerging_min_count` reports after it.
pub fn detect_emerging(
    dates: &[NaiveDate],
    undated: u64,
    reference: NaiveDate,
    config: &EngineConfig,
) -> Analysis<EmergingResult> {
    if dates.is_empty() {
        return Analysis::Skipped(SkipReason::NoDatedCases);
    }
    let Some(cutoff) = Duration::try_days(config.emerging_lookback_days)
        .and_then(|lookback| reference.checked_sub_signed(lookback))
    else {
        return Analysis::Skipped(SkipReason::LookbackOutOfRange {
            lookback_days: config.emerging_lookback_days,
        });
    };
    let prior_count = dates.iter().filter(|date| **date < cutoff).count() as u64;
    let recent_count = dates
        .iter()
        .filter(|date| **date >= cutoff && **date <= reference)
        .count() as u64;
    Analysis::Analyzed(EmergingResult {
        cutoff,
        prior_count,
        recent_count,
        undated_count: undated,
        is_emerging: prior_count == 0 && recent_count >= config.emerging_min_count,
    })
}

/// Run spike and emerging detection over the given case rows.
pub fn analyze(
    table: &CaseTable,
    rows: &[u32],
    reference: NaiveDate,
    config: &EngineConfig,
) -> TrendSummary {
    let dates: Vec<NaiveDate> = rows
        .iter()
        .filter_map(|row| table.event_date()[*row as usize])
        .collect();
    let undated = rows.len() as u64 - dates.len() as u64;
    TrendSummary {
        spike: detect_spike(&dates, reference, config),
        emerging: detect_emerging(&dates, undated, reference, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_keys_roll_over_year_end() {
        let december = PeriodKey::of(date(2023, 12, 31), TrendPeriod::Month);
        assert_eq!(december.next(TrendPeriod::Month).label(TrendPeriod::Month), "2024-01");
        let q4 = PeriodKey::of(date(2023, 11, 2), TrendPeriod::Quarter);
        assert_eq!(q4.label(TrendPeriod::Quarter), "2023Q4");
        assert_eq!(q4.next(TrendPeriod::Quarter).label(TrendPeriod::Quarter), "2024Q1");
    }

    #[test]
    fn periods_fill_gaps_with_zero() {
        let dates = [date(2023, 11, 2), date(2024, 2, 10), date(2024, 2, 11)];
        let current = PeriodKey::of(date(2024, 2, 28), TrendPeriod::Month);
        let counts = period_counts(&dates, TrendPeriod::Month, current);
        let values: Vec<u64> = counts.iter().map(|(_, c)| *c).collect();
        assert_eq!(values, vec![1, 0, 0, 2]);
    }

    #[test]
    fn quarters_roll_over_years() {
        let key = PeriodKey::of(date(2023, 12, 1), TrendPeriod::Quarter);
        assert_eq!(key.label(TrendPeriod::Quarter), "2023Q4");
        assert_eq!(key.next(TrendPeriod::Quarter).label(TrendPeriod::Quarter), "2024Q1");
    }
}
