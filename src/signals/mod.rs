//! Signal computation and ranking layer.

pub mod alert;
pub mod bayes;
pub mod disproportionality;
pub mod hypothesis;
pub mod report;
pub mod ror;
pub mod score;
pub mod subgroup;
pub mod trend;
pub mod weights;

use std::{sync::Arc, time::Instant};

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    data::cases::CaseTable,
    error::Result,
    index::{AggregationIndex, DatasetVersion, IndexHandle},
};

use self::{
    alert::Alert,
    bayes::GpsPrior,
    disproportionality::Disproportionality,
    score::{CaseProfile, ComponentScores, QuantumScore},
    subgroup::SubgroupResult,
    trend::TrendSummary,
};

/// Why an analysis was not run for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientCases { available: u64, required: u64 },
    InsufficientHistory { periods: usize, required: usize },
    /// No dated case on or before the reference date.
    NoDatedCases,
    /// The lookback window reaches outside the representable date range.
    LookbackOutOfRange { lookback_days: i64 },
}

/// Outcome of an optional analysis: either a result or the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Analysis<T> {
    Analyzed(T),
    Skipped(SkipReason),
}

impl<T> Analysis<T> {
    pub fn analyzed(&self) -> Option<&T> {
        match self {
            Analysis::Analyzed(value) => Some(value),
            Analysis::Skipped(_) => None,
        }
    }
}

/// One ranked (drug, reaction) pair.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub drug: String,
    pub reaction: String,
    pub count: u64,
    /// Position of the pair's first co-occurrence; breaks ranking ties.
    pub insertion_order: usize,
    pub statistics: Disproportionality,
    pub classical_signal: bool,
    pub quantum: QuantumScore,
    pub quantum_rank: usize,
    pub classical_rank: usize,
    /// classical_rank − quantum_rank; positive when the composite score ranks the pair higher.
    pub rank_divergence: i64,
    pub detected_early: bool,
    pub trend: Option<TrendSummary>,
    pub subgroups: Option<Analysis<Vec<SubgroupResult>>>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// Output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub dataset_version: DatasetVersion,
    pub total_cases: u64,
    pub total_candidates: usize,
    pub reference_date: NaiveDate,
    pub generated_at: chrono::DateTime<Utc>,
    pub config: EngineConfig,
    /// Top candidates in quantum-rank order.
    pub candidates: Vec<SignalCandidate>,
}

impl AnalysisReport {
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.candidates.iter().flat_map(|candidate| &candidate.alerts)
    }
}

/// Date that recency and trend windows are measured from.
pub fn reference_date(table: &CaseTable, config: &EngineConfig) -> NaiveDate {
    config
        .reference_date
        .or_else(|| table.latest_event_date())
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// Per-run inputs shared by every candidate evaluation.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub reference: NaiveDate,
    pub config: &'a EngineConfig,
    pub prior: GpsPrior,
}

impl<'a> RunContext<'a> {
    pub fn new(table: &CaseTable, config: &'a EngineConfig) -> Self {
        Self {
            reference: reference_date(table, config),
            config,
            prior: GpsPrior::default(),
        }
    }
}

/// Statistics and composite score for one pair. Ranks are filled in later.
pub fn evaluate_candidate(
    index: &AggregationIndex,
    (drug, reaction, rows): (&str, &str, &[u32]),
    insertion_order: usize,
    ctx: &RunContext<'_>,
) -> SignalCandidate {
    let cell = index.lookup_pair(drug, reaction);
    let statistics = Disproportionality::compute(cell, &ctx.prior);
    let profile = CaseProfile::from_rows(index.table(), rows);
    let components = ComponentScores::from_profile(&profile, index.total_cases(), ctx.reference);
    let quantum = score::quantum_score(components, &ctx.config.component_weights);
    SignalCandidate {
        drug: drug.to_string(),
        reaction: reaction.to_string(),
        count: cell.a,
        insertion_order,
        classical_signal: statistics.is_signal(),
        statistics,
        quantum,
        quantum_rank: 0,
        classical_rank: 0,
        rank_divergence: 0,
        detected_early: false,
        trend: None,
        subgroups: None,
        alerts: Vec::new(),
    }
}

/// Assign classical and quantum ranks, leaving `candidates` in quantum-rank order.
///
/// Both orders are stable sorts keyed on insertion order, so identical input
/// always produces identical ranks.
pub fn assign_ranks(candidates: &mut [SignalCandidate], early_detection_gap: i64) {
    candidates.sort_by_key(|candidate| candidate.insertion_order);
    let mut by_count: Vec<usize> = (0..candidates.len()).collect();
    by_count.sort_by(|x, y| candidates[*y].count.cmp(&candidates[*x].count));
    for (rank, idx) in by_count.into_iter().enumerate() {
        candidates[idx].classical_rank = rank + 1;
    }

    candidates.sort_by(|x, y| y.quantum.score.total_cmp(&x.quantum.score));
    for (rank, candidate) in candidates.iter_mut().enumerate() {
        candidate.quantum_rank = rank + 1;
        candidate.rank_divergence = candidate.classical_rank as i64 - candidate.quantum_rank as i64;
        candidate.detected_early = candidate.rank_divergence >= early_detection_gap;
    }
}

/// Attach trend and subgroup analyses and the alerts they raise.
pub fn enrich_candidate(
    candidate: &mut SignalCandidate,
    index: &AggregationIndex,
    reference: NaiveDate,
    config: &EngineConfig,
) {
    let rows = index.pair_rows(&candidate.drug, &candidate.reaction);
    let table = index.table();
    let trend = trend::analyze(table, &rows, reference, config);
    let subgroups = subgroup::analyze(
        table,
        &rows,
        config.min_subgroup_cases,
        config.subgroup_anomaly_threshold,
    );

    let (drug, reaction) = (candidate.drug.as_str(), candidate.reaction.as_str());
    let mut alerts = Vec::new();
    if let Some(spike) = trend.spike.analyzed() {
        alerts.extend(alert::spike_alert(drug, reaction, spike));
    }
    if let Some(emerging) = trend.emerging.analyzed() {
        alerts.extend(alert::emerging_alert(
            drug,
            reaction,
            emerging,
            config.emerging_lookback_days,
            config.emerging_min_count,
        ));
    }
    if let Some(results) = subgroups.analyzed() {
        alerts.extend(
            results
                .iter()
                .filter_map(|result| alert::subgroup_alert(drug, reaction, result)),
        );
    }

    candidate.trend = Some(trend);
    candidate.subgroups = Some(subgroups);
    candidate.alerts = alerts;
}

/// Evaluate every observed pair against one frozen index snapshot.
///
/// Candidates are scored in parallel, ranked in a single sequential sort, and
/// the top `top_n` are enriched with trend and subgroup analyses in parallel.
pub fn analyze(index: &AggregationIndex, config: &EngineConfig) -> AnalysisReport {
    let started = Instant::now();
    let ctx = RunContext::new(index.table(), config);
    let reference = ctx.reference;

    let pairs: Vec<(&str, &str, &[u32])> = index.pairs().collect();
    let mut candidates: Vec<SignalCandidate> = pairs
        .par_iter()
        .enumerate()
        .map(|(order, pair)| evaluate_candidate(index, *pair, order, &ctx))
        .collect();
    let total_candidates = candidates.len();
    debug!(total_candidates, "scored candidates");

    assign_ranks(&mut candidates, config.early_detection_gap);
    candidates.truncate(config.top_n);
    candidates
        .par_iter_mut()
        .for_each(|candidate| enrich_candidate(candidate, index, reference, config));

    let alerts: usize = candidates.iter().map(|c| c.alerts.len()).sum();
    info!(
        version = %index.version(),
        total_candidates,
        returned = candidates.len(),
        alerts,
        %reference,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "completed signal analysis"
    );

    AnalysisReport {
        dataset_version: index.version(),
        total_cases: index.total_cases(),
        total_candidates,
        reference_date: reference,
        generated_at: Utc::now(),
        config: config.clone(),
        candidates,
    }
}

/// Engine bound to a shared index slot and a validated configuration.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    handle: IndexHandle,
    config: EngineConfig,
}

impl SignalEngine {
    /// Validate `config` and build the initial index for `table`.
    pub fn new(table: Arc<CaseTable>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            handle: IndexHandle::new(table),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    pub fn version(&self) -> DatasetVersion {
        self.handle.snapshot().version()
    }

    /// Replace the index with one built from `table`. Runs already holding the
    /// previous snapshot finish against it.
    pub fn rebuild(&self, table: Arc<CaseTable>) -> DatasetVersion {
        self.handle.rebuild(table).version()
    }

    /// Run an analysis against the snapshot for `expected`, failing with
    /// `IndexStale` if the index has moved on.
    pub fn run(&self, expected: DatasetVersion) -> Result<AnalysisReport> {
        let snapshot = self.handle.snapshot_for(expected)?;
        Ok(analyze(&snapshot, &self.config))
    }
}
