//! Bayesian shrinkage measures: EBGM, IC and BCPNN.
//!
//! All three share the expected count E = (a+b)(a+c)/n under independence.

use serde::{Deserialize, Serialize};
use statrs::{
    distribution::{ContinuousCDF, Gamma},
    function::gamma::{digamma, ln_gamma},
};

use crate::{index::ContingencyCell, signals::ror::Z_95};

/// Pseudo-count added to observed and expected counts.
pub const PSEUDO_COUNT: f64 = 0.5;

/// Two-component gamma mixture prior for the gamma-Poisson shrinker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPrior {
    pub alpha1: f64,
    pub beta1: f64,
    pub alpha2: f64,
    pub beta2: f64,
    /// Mixing weight of the first component.
    pub p: f64,
}

impl Default for GpsPrior {
    fn default() -> Self {
        Self {
            alpha1: 0.2,
            beta1: 0.1,
            alpha2: 2.0,
            beta2: 4.0,
            p: 1.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EbgmEstimate {
    /// (a+0.5)/(E+0.5)
    pub ebgm: f64,
    pub eb05: f64,
    pub eb95: f64,
    pub expected: f64,
    /// exp(E[ln λ]) under the mixture posterior.
    pub posterior_geometric_mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcEstimate {
    pub ic: f64,
    pub ic025: f64,
    pub ic975: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BcpnnEstimate {
    pub ic: f64,
    pub ic025: f64,
    pub ic975: f64,
    pub sd: f64,
}

/// E = (a+b)(a+c)/n, absent when the table is empty or a margin is zero.
pub fn expected_count(cell: &ContingencyCell) -> Option<f64> {
    let n = cell.total();
    if n == 0 || cell.drug_total() == 0 || cell.reaction_total() == 0 {
        return None;
    }
    Some(cell.drug_total() as f64 * cell.reaction_total() as f64 / n as f64)
}

/// Negative binomial log-probability of `n` under a Gamma(alpha, beta) prior scaled by `e`.
fn ln_neg_binomial(n: f64, alpha: f64, beta: f64, e: f64) -> f64 {
    ln_gamma(alpha + n) - ln_gamma(alpha) - ln_gamma(n + 1.0)
        + alpha * (beta / (beta + e)).ln()
        + n * (e / (beta + e)).ln()
}

/// Posterior mixture over λ for one observed count.
struct GammaMixture {
    weight: f64,
    first: Gamma,
    second: Gamma,
}

impl GammaMixture {
    fn posterior(prior: &GpsPrior, n: f64, e: f64) -> Option<Self> {
        let ln_f1 = ln_neg_binomial(n, prior.alpha1, prior.beta1, e);
        let ln_f2 = ln_neg_binomial(n, prior.alpha2, prior.beta2, e);
        let log_odds = (1.0 - prior.p).ln() + ln_f2 - prior.p.ln() - ln_f1;
        let weight = 1.0 / (1.0 + log_odds.exp());
        if !weight.is_finite() {
            return None;
        }
        Some(Self {
            weight,
            first: Gamma::new(prior.alpha1 + n, prior.beta1 + e).ok()?,
            second: Gamma::new(prior.alpha2 + n, prior.beta2 + e).ok()?,
        })
    }

    fn cdf(&self, x: f64) -> f64 {
        self.weight * self.first.cdf(x) + (1.0 - self.weight) * self.second.cdf(x)
    }

    fn mean_log(&self, prior: &GpsPrior, n: f64, e: f64) -> f64 {
        self.weight * (digamma(prior.alpha1 + n) - (prior.beta1 + e).ln())
            + (1.0 - self.weight) * (digamma(prior.alpha2 + n) - (prior.beta2 + e).ln())
    }
}

/// Invert a monotone CDF on (0, ∞) by bracketing then bisection.
fn quantile(cdf: impl Fn(f64) -> f64, p: f64, start: f64) -> Option<f64> {
    let mut high = start.max(1.0);
    let mut guard = 0;
    while cdf(high) < p {
        high *= 2.0;
        guard += 1;
        if guard > 200 || !high.is_finite() {
            return None;
        }
    }
    let mut low = 0.0;
    for _ in 0..200 {
        let mid = 0.5 * (low + high);
        if cdf(mid) < p {
            low = mid;
        } else {
            high = mid;
        }
        if high - low <= 1e-12 * high.max(1e-300) {
            break;
        }
    }
    Some(0.5 * (low + high))
}

/// Empirical Bayes geometric mean with EB05/EB95 from the gamma-Poisson shrinker.
pub fn ebgm(cell: &ContingencyCell, prior: &GpsPrior) -> Option<EbgmEstimate> {
    let e = expected_count(cell)?;
    let n = cell.a as f64;
    let mixture = GammaMixture::posterior(prior, n, e)?;
    let start = (n + prior.alpha2) / e;
    let eb05 = quantile(|x| mixture.cdf(x), 0.05, start)?;
    let eb95 = quantile(|x| mixture.cdf(x), 0.95, start)?;
    Some(EbgmEstimate {
        ebgm: (n + PSEUDO_COUNT) / (e + PSEUDO_COUNT),
        eb05,
        eb95,
        expected: e,
        posterior_geometric_mean: mixture.mean_log(prior, n, e).exp(),
    })
}

/// IC = log2((a+λ)/E) with a Gamma(a+λ, E) credibility interval.
pub fn information_component(cell: &ContingencyCell) -> Option<IcEstimate> {
    let e = expected_count(cell)?;
    let shape = cell.a as f64 + PSEUDO_COUNT;
    let posterior = Gamma::new(shape, e).ok()?;
    let start = shape / e;
    let low = quantile(|x| posterior.cdf(x), 0.025, start)?;
    let high = quantile(|x| posterior.cdf(x), 0.975, start)?;
    Some(IcEstimate {
        ic: (shape / e).log2(),
        ic025: low.log2(),
        ic975: high.log2(),
    })
}

/// Bayesian confidence propagation neural network IC with beta priors
/// (α1 = β1 = 1, α = β = 2, γ11 = 1).
pub fn bcpnn(cell: &ContingencyCell) -> Option<BcpnnEstimate> {
    let n = cell.total() as f64;
    if n == 0.0 {
        return None;
    }
    let a = cell.a as f64;
    let drug = cell.drug_total() as f64;
    let reaction = cell.reaction_total() as f64;
    let (alpha1, beta1, alpha, beta, gamma11) = (1.0, 1.0, 2.0, 2.0, 1.0);
    let gamma = gamma11 * (n + alpha) * (n + beta) / ((drug + alpha1) * (reaction + beta1));

    let ratio = (a + gamma11) * (n + alpha) * (n + beta)
        / ((n + gamma) * (drug + alpha1) * (reaction + beta1));
    let ic = ratio.log2();

    let ln2_sq = std::f64::consts::LN_2.powi(2);
    let variance = ((n - a + gamma - gamma11) / ((a + gamma11) * (1.0 + n + gamma))
        + (n - drug + alpha - alpha1) / ((drug + alpha1) * (1.0 + n + alpha))
        + (n - reaction + beta - beta1) / ((reaction + beta1) * (1.0 + n + beta)))
        / ln2_sq;
    if !(ic.is_finite() && variance.is_finite() && variance >= 0.0) {
        return None;
    }
    let sd = variance.sqrt();
    Some(BcpnnEstimate {
        ic,
        ic025: ic - Z_95 * sd,
        ic975: ic + Z_95 * sd,
        sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_count_uses_margins() {
        let cell = ContingencyCell::new(100, 900, 500, 8500);
        let e = expected_count(&cell).unwrap();
        assert!((e - 60.0).abs() < 1e-9);
    }

    #[test]
    fn ebgm_interval_brackets_posterior() {
        let cell = ContingencyCell::new(100, 900, 500, 8500);
        let estimate = ebgm(&cell, &GpsPrior::default()).unwrap();
        assert!((estimate.ebgm - 100.5 / 60.5).abs() < 1e-9);
        assert!(estimate.eb05 < estimate.posterior_geometric_mean);
        assert!(estimate.posterior_geometric_mean < estimate.eb95);
        assert!(estimate.eb05 > 1.0);
    }

    #[test]
    fn ic_interval_contains_point() {
        let cell = ContingencyCell::new(3, 40, 20, 5000);
        let estimate = information_component(&cell).unwrap();
        assert!(estimate.ic025 < estimate.ic && estimate.ic < estimate.ic975);
    }

    #[test]
    fn bcpnn_is_positive_for_overreported_pair() {
        let cell = ContingencyCell::new(100, 900, 500, 8500);
        let estimate = bcpnn(&cell).unwrap();
        assert!(estimate.ic > 0.0);
        assert!(estimate.ic025 < estimate.ic && estimate.ic < estimate.ic975);
    }

    #[test]
    fn empty_margins_are_not_computable() {
        let cell = ContingencyCell::new(0, 0, 5, 10);
        assert!(expected_count(&cell).is_none());
        assert!(ebgm(&cell, &GpsPrior::default()).is_none());
        assert!(information_component(&cell).is_none());
    }
}
