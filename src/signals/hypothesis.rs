//! Independence tests on the 2x2 table.

use serde::{Deserialize, Serialize};
use statrs::function::{factorial::ln_factorial, gamma::gamma_ur};

use crate::index::ContingencyCell;

/// Cells below this count make the chi-squared approximation unreliable.
pub const SMALL_CELL: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquared {
    pub statistic: f64,
    pub p_value: f64,
}

/// Pearson chi-squared with one degree of freedom.
pub fn chi_squared(cell: &ContingencyCell) -> Option<ChiSquared> {
    let n = cell.total() as f64;
    let rows = [cell.drug_total() as f64, (cell.c + cell.d) as f64];
    let cols = [cell.reaction_total() as f64, (cell.b + cell.d) as f64];
    if n == 0.0 || rows.iter().chain(&cols).any(|margin| *margin == 0.0) {
        return None;
    }
    let observed = [
        [cell.a as f64, cell.b as f64],
        [cell.c as f64, cell.d as f64],
    ];
    let mut statistic = 0.0;
    for (i, row) in rows.iter().enumerate() {
        for (j, col) in cols.iter().enumerate() {
            let expected = row * col / n;
            statistic += (observed[i][j] - expected).powi(2) / expected;
        }
    }
    if !statistic.is_finite() {
        return None;
    }
    // Survival function of chi2(1) is Q(1/2, x/2).
    let p_value = if statistic <= 0.0 {
        1.0
    } else {
        gamma_ur(0.5, statistic / 2.0)
    };
    Some(ChiSquared { statistic, p_value })
}

fn ln_hypergeometric(a: u64, row1: u64, col1: u64, n: u64) -> f64 {
    let b = row1 - a;
    let c = col1 - a;
    let d = n - row1 - c;
    ln_factorial(row1) + ln_factorial(n - row1) + ln_factorial(col1) + ln_factorial(n - col1)
        - ln_factorial(n)
        - ln_factorial(a)
        - ln_factorial(b)
        - ln_factorial(c)
        - ln_factorial(d)
}

/// Two-sided Fisher's exact p-value: total probability of tables with the
/// same margins that are no more likely than the observed one.
pub fn fisher_exact(cell: &ContingencyCell) -> Option<f64> {
    let n = cell.total();
    if n == 0 {
        return None;
    }
    let row1 = cell.drug_total();
    let col1 = cell.reaction_total();
    let low = (row1 + col1).saturating_sub(n);
    let high = row1.min(col1);
    let observed = ln_hypergeometric(cell.a, row1, col1, n);
    // Relative tolerance so tables tied with the observed one are counted.
    let cutoff = observed + 1e-7_f64.ln_1p();
    let mut p_value = 0.0;
    for a in low..=high {
        let ln_p = ln_hypergeometric(a, row1, col1, n);
        if ln_p <= cutoff {
            p_value += ln_p.exp();
        }
    }
    Some(p_value.min(1.0))
}

/// Whether Fisher's exact test should be preferred over chi-squared.
pub fn prefers_exact(cell: &ContingencyCell) -> bool {
    cell.min_cell() < SMALL_CELL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chi_squared_matches_reference_table() {
        // Worked example: a=10, b=20, c=30, d=40 gives chi2 ≈ 0.7937.
        let result = chi_squared(&ContingencyCell::new(10, 20, 30, 40)).unwrap();
        assert!((result.statistic - 0.793_650_79).abs() < 1e-6);
        assert!((result.p_value - 0.373).abs() < 1e-3);
    }

    #[test]
    fn fisher_matches_tea_tasting() {
        // Lady tasting tea: [[3,1],[1,3]] two-sided p = 0.4857.
        let p = fisher_exact(&ContingencyCell::new(3, 1, 1, 3)).unwrap();
        assert!((p - 0.485_714).abs() < 1e-5);
    }

    #[test]
    fn fisher_is_one_for_balanced_table() {
        let p = fisher_exact(&ContingencyCell::new(2, 2, 2, 2)).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_margins_have_no_chi_squared() {
        assert!(chi_squared(&ContingencyCell::new(0, 0, 3, 4)).is_none());
    }
}
