//! Shared DTOs for JSON responses.

use serde::Serialize;

use crate::signals::SignalCandidate;

/// Flattened view of one ranked candidate.
#[derive(Debug, Clone, Serialize)]
pub struct SignalDto {
    pub drug: String,
    pub reaction: String,
    pub count: u64,
    pub quantum_rank: usize,
    pub classical_rank: usize,
    pub quantum_score: f64,
    pub prr: Option<f64>,
    pub ror: Option<f64>,
    pub ror_ci_low: Option<f64>,
    pub ebgm: Option<f64>,
    pub eb05: Option<f64>,
    pub ic025: Option<f64>,
    pub classical_signal: bool,
    pub detected_early: bool,
    pub alerts: usize,
}

impl From<&SignalCandidate> for SignalDto {
    fn from(c: &SignalCandidate) -> Self {
        let stats = &c.statistics;
        SignalDto {
            drug: c.drug.clone(),
            reaction: c.reaction.clone(),
            count: c.count,
            quantum_rank: c.quantum_rank,
            classical_rank: c.classical_rank,
            quantum_score: c.quantum.score,
            prr: stats.prr.map(|e| e.value),
            ror: stats.ror.map(|e| e.value),
            ror_ci_low: stats.ror.map(|e| e.ci_low),
            ebgm: stats.ebgm.map(|e| e.ebgm),
            eb05: stats.ebgm.map(|e| e.eb05),
            ic025: stats.ic.map(|e| e.ic025),
            classical_signal: c.classical_signal,
            detected_early: c.detected_early,
            alerts: c.alerts.len(),
        }
    }
}
