//! Demographic and clinical subgroup concentration among a candidate's cases.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    data::cases::CaseTable,
    signals::{Analysis, SkipReason},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sex,
    AgeGroup,
    Region,
    Indication,
    Dose,
    WeightGroup,
    OnsetTime,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Sex,
        Dimension::AgeGroup,
        Dimension::Region,
        Dimension::Indication,
        Dimension::Dose,
        Dimension::WeightGroup,
        Dimension::OnsetTime,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Sex => "sex",
            Dimension::AgeGroup => "age_group",
            Dimension::Region => "region",
            Dimension::Indication => "indication",
            Dimension::Dose => "dose",
            Dimension::WeightGroup => "weight_group",
            Dimension::OnsetTime => "onset_time",
        }
    }

    /// Whether the source table carried the column(s) this dimension needs.
    pub fn available(self, table: &CaseTable) -> bool {
        let columns = table.columns();
        match self {
            Dimension::Sex => columns.sex,
            Dimension::AgeGroup => columns.age,
            Dimension::Region => columns.region,
            Dimension::Indication => columns.indication,
            Dimension::Dose => columns.dose,
            Dimension::WeightGroup => columns.weight,
            Dimension::OnsetTime => columns.onset_date && columns.start_date,
        }
    }

    /// Bucket label for one case, if it has a usable value.
    pub fn bucket(self, table: &CaseTable, row: usize) -> Option<String> {
        match self {
            Dimension::Sex => table.sex()[row].clone(),
            Dimension::AgeGroup => table.age()[row].and_then(age_bucket).map(str::to_string),
            Dimension::Region => table.region()[row].clone(),
            Dimension::Indication => table.indication()[row].clone(),
            Dimension::Dose => table.dose()[row].clone(),
            Dimension::WeightGroup => table.weight()[row].and_then(weight_bucket).map(str::to_string),
            Dimension::OnsetTime => match (table.start_date()[row], table.onset_date()[row]) {
                (Some(start), Some(onset)) => {
                    onset_bucket((onset - start).num_days()).map(str::to_string)
                }
                _ => None,
            },
        }
    }
}

pub fn age_bucket(age: f64) -> Option<&'static str> {
    if !age.is_finite() || age < 0.0 {
        return None;
    }
    Some(match age {
        a if a < 18.0 => "<18",
        a if a < 30.0 => "18-29",
        a if a < 45.0 => "30-44",
        a if a < 60.0 => "45-59",
        a if a < 75.0 => "60-74",
        _ => "75+",
    })
}

pub fn weight_bucket(kg: f64) -> Option<&'static str> {
    if !kg.is_finite() || kg <= 0.0 {
        return None;
    }
    Some(match kg {
        w if w < 50.0 => "<50",
        w if w < 70.0 => "50-69",
        w if w < 90.0 => "70-89",
        w if w < 110.0 => "90-109",
        _ => "110+",
    })
}

/// Days from drug start to reaction onset. Onset before start is unusable.
pub fn onset_bucket(days: i64) -> Option<&'static str> {
    match days {
        d if d < 0 => None,
        0..=1 => Some("<=1d"),
        2..=7 => Some("2-7d"),
        8..=30 => Some("8-30d"),
        _ => Some(">30d"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub bucket: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnomalyScore {
    /// Top bucket count over second bucket count.
    Ratio(f64),
    /// Only one bucket observed; no ratio exists.
    SingleGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupResult {
    pub dimension: Dimension,
    /// Buckets by descending count, ties by label.
    pub distribution: Vec<BucketCount>,
    pub top_bucket: String,
    pub top_count: u64,
    pub second_count: Option<u64>,
    pub anomaly: AnomalyScore,
    pub flagged: bool,
}

/// Rank buckets and score the top one against the runner-up.
pub fn summarize(
    dimension: Dimension,
    counts: impl IntoIterator<Item = (String, u64)>,
    threshold: f64,
) -> Option<SubgroupResult> {
    let mut distribution: Vec<BucketCount> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(bucket, count)| BucketCount { bucket, count })
        .collect();
    distribution.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| x.bucket.cmp(&y.bucket)));
    let top = distribution.first()?.clone();
    let second_count = distribution.get(1).map(|bucket| bucket.count);
    let anomaly = match second_count {
        Some(second) => AnomalyScore::Ratio(top.count as f64 / second as f64),
        None => AnomalyScore::SingleGroup,
    };
    let flagged = matches!(anomaly, AnomalyScore::Ratio(ratio) if ratio > threshold);
    Some(SubgroupResult {
        dimension,
        distribution,
        top_bucket: top.bucket,
        top_count: top.count,
        second_count,
        anomaly,
        flagged,
    })
}

/// Analyse every dimension whose source columns are present.
pub fn analyze(
    table: &CaseTable,
    rows: &[u32],
    min_cases: u64,
    threshold: f64,
) -> Analysis<Vec<SubgroupResult>> {
    if (rows.len() as u64) < min_cases {
        return Analysis::Skipped(SkipReason::InsufficientCases {
            available: rows.len() as u64,
            required: min_cases,
        });
    }
    let results = Dimension::ALL
        .iter()
        .filter(|dimension| dimension.available(table))
        .filter_map(|dimension| {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for row in rows {
                if let Some(bucket) = dimension.bucket(table, *row as usize) {
                    *counts.entry(bucket).or_insert(0) += 1;
                }
            }
            summarize(*dimension, counts, threshold)
        })
        .collect();
    Analysis::Analyzed(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_buckets_follow_boundaries() {
        assert_eq!(age_bucket(17.9), Some("<18"));
        assert_eq!(age_bucket(18.0), Some("18-29"));
        assert_eq!(age_bucket(59.0), Some("45-59"));
        assert_eq!(age_bucket(75.0), Some("75+"));
        assert_eq!(age_bucket(-1.0), None);
    }

    #[test]
    fn onset_buckets() {
        assert_eq!(onset_bucket(0), Some("<=1d"));
        assert_eq!(onset_bucket(1), Some("<=1d"));
        assert_eq!(onset_bucket(7), Some("2-7d"));
        assert_eq!(onset_bucket(31), Some(">30d"));
        assert_eq!(onset_bucket(-2), None);
    }

    #[test]
    fn single_bucket_is_not_scored() {
        let result = summarize(Dimension::Sex, vec![("F".to_string(), 9)], 2.0).unwrap();
        assert_eq!(result.anomaly, AnomalyScore::SingleGroup);
        assert!(!result.flagged);
    }

    #[test]
    fn ties_break_by_label() {
        let result = summarize(
            Dimension::Region,
            vec![("US".to_string(), 4), ("EU".to_string(), 4)],
            2.0,
        )
        .unwrap();
        assert_eq!(result.top_bucket, "EU");
        assert_eq!(result.anomaly, AnomalyScore::Ratio(1.0));
    }
}
