//! Composite anomaly score ("quantum score").
//!
//! A weighted sum of rarity, seriousness, recency and count sufficiency, plus
//! non-linear interaction bonuses and near-threshold "tunneling" credit.
//! Deterministic; no relation to quantum computing beyond the name.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    data::cases::{CaseTable, Outcome},
    signals::weights::ComponentWeights,
};

/// Facts about a candidate's cases that feed the component scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseProfile {
    pub count: u64,
    pub serious_count: u64,
    pub any_death: bool,
    pub any_hospitalization_or_life_threatening: bool,
    pub any_disability: bool,
    pub latest_event: Option<NaiveDate>,
}

impl CaseProfile {
    pub fn from_rows(table: &CaseTable, rows: &[u32]) -> Self {
        let mut profile = Self {
            count: rows.len() as u64,
            ..Self::default()
        };
        for &row in rows {
            let row = row as usize;
            if table.serious()[row] {
                profile.serious_count += 1;
            }
            match table.outcome()[row] {
                Outcome::Death => profile.any_death = true,
                Outcome::Hospitalization | Outcome::LifeThreatening => {
                    profile.any_hospitalization_or_life_threatening = true
                }
                Outcome::Disability => profile.any_disability = true,
                Outcome::None => {}
            }
            if let Some(date) = table.event_date()[row] {
                profile.latest_event = profile.latest_event.max(Some(date));
            }
        }
        profile
    }

    pub fn serious_fraction(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.serious_count as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub rarity: f64,
    pub seriousness: f64,
    pub recency: f64,
    pub count: f64,
}

impl ComponentScores {
    pub fn from_profile(profile: &CaseProfile, total_cases: u64, reference: NaiveDate) -> Self {
        Self {
            rarity: rarity_score(profile.count, total_cases),
            seriousness: seriousness_score(profile),
            recency: profile
                .latest_event
                .map_or(0.0, |latest| recency_score((reference - latest).num_days())),
            count: count_score(profile.count),
        }
    }

    fn clamped(self) -> Self {
        Self {
            rarity: self.rarity.clamp(0.0, 1.0),
            seriousness: self.seriousness.clamp(0.0, 1.0),
            recency: self.recency.clamp(0.0, 1.0),
            count: self.count.clamp(0.0, 1.0),
        }
    }
}

pub fn rarity_score(count: u64, total_cases: u64) -> f64 {
    if total_cases == 0 {
        return 0.0;
    }
    (1.0 - count as f64 / total_cases as f64).clamp(0.0, 1.0)
}

/// Serious-fraction term plus presence bonuses, clamped to [0, 1].
pub fn seriousness_score(profile: &CaseProfile) -> f64 {
    let mut score = 0.5 * profile.serious_fraction();
    if profile.serious_count > 0 {
        score += 0.5;
    }
    if profile.any_death {
        score += 0.5;
    }
    if profile.any_hospitalization_or_life_threatening {
        score += 0.3;
    }
    if profile.any_disability {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// Piecewise decay over one year, two years, and beyond. Future dates count as today.
pub fn recency_score(days_ago: i64) -> f64 {
    let days = days_ago.max(0) as f64;
    if days <= 365.0 {
        1.0 - (days / 365.0) * 0.5
    } else if days <= 730.0 {
        0.5 - ((days - 365.0) / 365.0) * 0.3
    } else {
        (0.2 - (days - 730.0) / 3650.0).max(0.0)
    }
}

pub fn count_score(count: u64) -> f64 {
    (count as f64 / 10.0).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    RareAndSerious,
    RareAndRecent,
    SeriousAndRecent,
    /// Applies on top of the pairwise bonuses, never instead of them.
    RareSeriousRecent,
    TunnelingRarity,
    TunnelingSeriousness,
    TunnelingRecency,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub kind: BonusKind,
    pub amount: f64,
}

/// Final score with its full breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumScore {
    pub score: f64,
    pub base: f64,
    pub components: ComponentScores,
    /// Each component multiplied by its weight.
    pub weighted: ComponentScores,
    pub bonuses: Vec<Bonus>,
}

const TUNNEL_LOW: f64 = 0.5;
const TUNNEL_HIGH: f64 = 0.7;

fn in_tunnel(value: f64) -> bool {
    value > TUNNEL_LOW && value <= TUNNEL_HIGH
}

/// Interaction bonuses are independent and additive; the three-way bonus
/// compounds with the pairwise ones.
pub fn interaction_bonuses(c: &ComponentScores) -> Vec<Bonus> {
    let mut bonuses = Vec::new();
    let mut push = |applies: bool, kind: BonusKind, amount: f64| {
        if applies {
            bonuses.push(Bonus { kind, amount });
        }
    };
    push(c.rarity > 0.7 && c.seriousness > 0.5, BonusKind::RareAndSerious, 0.15);
    push(c.rarity > 0.7 && c.recency > 0.7, BonusKind::RareAndRecent, 0.10);
    push(c.seriousness > 0.7 && c.recency > 0.7, BonusKind::SeriousAndRecent, 0.10);
    push(
        c.rarity > 0.6 && c.seriousness > 0.6 && c.recency > 0.6,
        BonusKind::RareSeriousRecent,
        0.20,
    );
    push(in_tunnel(c.rarity), BonusKind::TunnelingRarity, 0.05);
    push(in_tunnel(c.seriousness), BonusKind::TunnelingSeriousness, 0.05);
    push(in_tunnel(c.recency), BonusKind::TunnelingRecency, 0.05);
    bonuses
}

pub fn quantum_score(components: ComponentScores, weights: &ComponentWeights) -> QuantumScore {
    let components = components.clamped();
    let weighted = ComponentScores {
        rarity: components.rarity * weights.rarity,
        seriousness: components.seriousness * weights.seriousness,
        recency: components.recency * weights.recency,
        count: components.count * weights.count,
    };
    let base = weighted.rarity + weighted.seriousness + weighted.recency + weighted.count;
    let bonuses = interaction_bonuses(&components);
    let bonus_total: f64 = bonuses.iter().map(|bonus| bonus.amount).sum();
    QuantumScore {
        score: (base + bonus_total).clamp(0.0, 1.0),
        base,
        components,
        weighted,
        bonuses,
    }
}
