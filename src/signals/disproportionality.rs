//! Full set of disproportionality statistics for one 2x2 table.

use serde::{Deserialize, Serialize};

use crate::{
    index::ContingencyCell,
    signals::{
        bayes::{self, BcpnnEstimate, EbgmEstimate, GpsPrior, IcEstimate},
        hypothesis::{self, ChiSquared},
        ror::{self, RatioEstimate},
    },
};

/// Which test supplied [`Disproportionality::preferred_p_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredTest {
    ChiSquared,
    FisherExact,
}

/// Each statistic is independently absent when its preconditions fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disproportionality {
    pub cell: ContingencyCell,
    pub prr: Option<RatioEstimate>,
    pub ror: Option<RatioEstimate>,
    pub ebgm: Option<EbgmEstimate>,
    pub ic: Option<IcEstimate>,
    pub bcpnn: Option<BcpnnEstimate>,
    pub chi_squared: Option<ChiSquared>,
    pub fisher_p: Option<f64>,
    pub preferred_test: PreferredTest,
}

impl Disproportionality {
    pub fn compute(cell: ContingencyCell, prior: &GpsPrior) -> Self {
        let preferred_test = if hypothesis::prefers_exact(&cell) {
            PreferredTest::FisherExact
        } else {
            PreferredTest::ChiSquared
        };
        Self {
            prr: ror::prr(&cell),
            ror: ror::ror(&cell),
            ebgm: bayes::ebgm(&cell, prior),
            ic: bayes::information_component(&cell),
            bcpnn: bayes::bcpnn(&cell),
            chi_squared: hypothesis::chi_squared(&cell),
            fisher_p: hypothesis::fisher_exact(&cell),
            preferred_test,
            cell,
        }
    }

    /// Fisher's p when any cell is small, chi-squared p otherwise.
    pub fn preferred_p_value(&self) -> Option<f64> {
        match self.preferred_test {
            PreferredTest::FisherExact => self.fisher_p,
            PreferredTest::ChiSquared => self.chi_squared.map(|chi| chi.p_value),
        }
    }

    /// Evans criterion: PRR ≥ 2, at least three cases, chi-squared ≥ 4.
    pub fn is_signal(&self) -> bool {
        match (self.prr, self.chi_squared) {
            (Some(prr), Some(chi)) => prr.value >= 2.0 && self.cell.a >= 3 && chi.statistic >= 4.0,
            _ => false,
        }
    }
}
