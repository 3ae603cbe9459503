//! Alerts raised by the trend and subgroup analyzers.

use serde::{Deserialize, Serialize};

use crate::signals::{
    subgroup::{AnomalyScore, Dimension, SubgroupResult},
    trend::{EmergingResult, SpikeResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Spike,
    Emerging,
    SubgroupAnomaly,
}

/// Numbers behind an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    ZScore {
        z_score: f64,
        current_count: u64,
        baseline_mean: f64,
        baseline_sd: f64,
    },
    Emergence {
        recent_count: u64,
        lookback_days: i64,
    },
    Anomaly {
        dimension: Dimension,
        bucket: String,
        top_count: u64,
        second_count: u64,
        score: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub drug: String,
    pub reaction: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub summary: String,
    pub evidence: Evidence,
}

fn spike_severity(z: f64) -> Severity {
    match z {
        z if z < 3.0 => Severity::Low,
        z if z < 5.0 => Severity::Medium,
        z if z < 10.0 => Severity::High,
        _ => Severity::Critical,
    }
}

fn emerging_severity(count: u64, min_count: u64) -> Severity {
    if count >= 3 * min_count {
        Severity::High
    } else if count >= 2 * min_count {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn subgroup_severity(ratio: f64) -> Severity {
    if ratio >= 5.0 {
        Severity::High
    } else if ratio >= 3.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn spike_alert(drug: &str, reaction: &str, spike: &SpikeResult) -> Option<Alert> {
    if !spike.is_spike {
        return None;
    }
    Some(Alert {
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        kind: AlertKind::Spike,
        severity: spike_severity(spike.z_score),
        summary: format!(
            "{drug} / {reaction}: {} reports in {} against a baseline of {:.1} (z = {:.1})",
            spike.current_count, spike.current_period, spike.baseline_mean, spike.z_score
        ),
        evidence: Evidence::ZScore {
            z_score: spike.z_score,
            current_count: spike.current_count,
            baseline_mean: spike.baseline_mean,
            baseline_sd: spike.baseline_sd,
        },
    })
}

pub fn emerging_alert(
    drug: &str,
    reaction: &str,
    emerging: &EmergingResult,
    lookback_days: i64,
    min_count: u64,
) -> Option<Alert> {
    if !emerging.is_emerging {
        return None;
    }
    Some(Alert {
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        kind: AlertKind::Emerging,
        severity: emerging_severity(emerging.recent_count, min_count),
        summary: format!(
            "{drug} / {reaction}: new combination, {} reports since {} and none before",
            emerging.recent_count, emerging.cutoff
        ),
        evidence: Evidence::Emergence {
            recent_count: emerging.recent_count,
            lookback_days,
        },
    })
}

pub fn subgroup_alert(drug: &str, reaction: &str, result: &SubgroupResult) -> Option<Alert> {
    let (AnomalyScore::Ratio(score), Some(second_count)) = (result.anomaly, result.second_count)
    else {
        return None;
    };
    if !result.flagged {
        return None;
    }
    let dimension = result.dimension.label();
    Some(Alert {
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        kind: AlertKind::SubgroupAnomaly,
        severity: subgroup_severity(score),
        summary: format!(
            "{drug} / {reaction}: {dimension} `{}` has {} cases, {score:.2}x the next group",
            result.top_bucket, result.top_count
        ),
        evidence: Evidence::Anomaly {
            dimension: result.dimension,
            bucket: result.top_bucket.clone(),
            top_count: result.top_count,
            second_count,
            score,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scales_with_z() {
        assert_eq!(spike_severity(2.5), Severity::Low);
        assert_eq!(spike_severity(4.0), Severity::Medium);
        assert_eq!(spike_severity(7.0), Severity::High);
        assert_eq!(spike_severity(36.0), Severity::Critical);
    }

    #[test]
    fn emerging_severity_uses_multiples_of_minimum() {
        assert_eq!(emerging_severity(3, 3), Severity::Low);
        assert_eq!(emerging_severity(6, 3), Severity::Medium);
        assert_eq!(emerging_severity(9, 3), Severity::High);
    }
}
