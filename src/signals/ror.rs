//! Proportional reporting ratio and reporting odds ratio.

use serde::{Deserialize, Serialize};

use crate::index::ContingencyCell;

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// A point estimate with its 95% interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioEstimate {
    pub value: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// Standard error of the log estimate.
    pub log_se: f64,
}

impl RatioEstimate {
    /// Log-normal interval around `value` with standard error `log_se` on the log scale.
    fn log_normal(value: f64, log_se: f64) -> Option<Self> {
        if !(value.is_finite() && value > 0.0 && log_se.is_finite()) {
            return None;
        }
        let log_value = value.ln();
        Some(Self {
            value,
            ci_low: (log_value - Z_95 * log_se).exp(),
            ci_high: (log_value + Z_95 * log_se).exp(),
            log_se,
        })
    }

    /// Lower bound above one: the conventional "significant" reading.
    pub fn lower_bound_exceeds_one(&self) -> bool {
        self.ci_low > 1.0
    }
}

/// PRR = (a/(a+b)) / (c/(c+d)).
///
/// Not computable when a+b, c+d or c is zero. A zero `a` also has no log
/// interval and is reported as not computable.
pub fn prr(cell: &ContingencyCell) -> Option<RatioEstimate> {
    let ContingencyCell { a, b, c, d } = *cell;
    if a == 0 || c == 0 || a + b == 0 || c + d == 0 {
        return None;
    }
    let (a, b, c, d) = (a as f64, b as f64, c as f64, d as f64);
    let value = (a / (a + b)) / (c / (c + d));
    let variance = 1.0 / a - 1.0 / (a + b) + 1.0 / c - 1.0 / (c + d);
    RatioEstimate::log_normal(value, variance.max(0.0).sqrt())
}

/// ROR = (a·d)/(b·c). Not computable when any cell is zero.
pub fn ror(cell: &ContingencyCell) -> Option<RatioEstimate> {
    let ContingencyCell { a, b, c, d } = *cell;
    if a == 0 || b == 0 || c == 0 || d == 0 {
        return None;
    }
    let (a, b, c, d) = (a as f64, b as f64, c as f64, d as f64);
    let value = (a * d) / (b * c);
    let variance = 1.0 / a + 1.0 / b + 1.0 / c + 1.0 / d;
    RatioEstimate::log_normal(value, variance.sqrt())
}
