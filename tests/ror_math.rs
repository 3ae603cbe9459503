use proptest::prelude::*;
use signal_ranker::{
    index::ContingencyCell,
    signals::{
        bayes::{self, GpsPrior},
        disproportionality::{Disproportionality, PreferredTest},
        ror,
    },
};

#[test]
fn prr_matches_reference_table() {
    let cell = ContingencyCell::new(100, 900, 500, 8500);
    let prr = ror::prr(&cell).unwrap();
    assert!((prr.value - 1.8).abs() < 1e-9);
    assert!(prr.ci_low < prr.value && prr.value < prr.ci_high);
    assert!(prr.lower_bound_exceeds_one());

    let ror_value = ror::ror(&cell).unwrap();
    assert!((ror_value.value - 100.0 * 8500.0 / (900.0 * 500.0)).abs() < 1e-9);
}

#[test]
fn zero_cells_leave_statistics_absent() {
    let cell = ContingencyCell::new(5, 0, 3, 10);
    assert!(ror::prr(&cell).is_some());
    assert!(ror::ror(&cell).is_none());
    assert!(ror::prr(&ContingencyCell::new(0, 10, 3, 10)).is_none());
}

#[test]
fn small_tables_prefer_the_exact_test() {
    let small = Disproportionality::compute(ContingencyCell::new(3, 20, 40, 900), &GpsPrior::default());
    assert_eq!(small.preferred_test, PreferredTest::FisherExact);
    assert!(small.fisher_p.is_some());

    let large = Disproportionality::compute(ContingencyCell::new(100, 900, 500, 8500), &GpsPrior::default());
    assert_eq!(large.preferred_test, PreferredTest::ChiSquared);
    // PRR 1.8 falls short of the Evans threshold.
    assert!(!large.is_signal());

    let strong = Disproportionality::compute(ContingencyCell::new(30, 70, 100, 9800), &GpsPrior::default());
    assert!(strong.is_signal());
    assert!(strong.preferred_p_value().unwrap() < 0.001);
}

#[test]
fn bayesian_intervals_are_ordered() {
    let cell = ContingencyCell::new(100, 900, 500, 8500);
    let ebgm = bayes::ebgm(&cell, &GpsPrior::default()).unwrap();
    assert!(ebgm.eb05 > 0.0 && ebgm.eb05 < ebgm.eb95);
    let ic = bayes::information_component(&cell).unwrap();
    assert!(ic.ic025 < ic.ic && ic.ic < ic.ic975);
    assert!(ic.ic > 0.0);
}

proptest! {
    #[test]
    fn prr_and_ror_agree_in_direction(a in 1u64..500, b in 1u64..500, c in 1u64..500, d in 1u64..500) {
        let cell = ContingencyCell::new(a, b, c, d);
        let prr = ror::prr(&cell).unwrap().value;
        let ror_value = ror::ror(&cell).unwrap().value;
        let (ad, bc) = (a * d, b * c);
        if ad > bc {
            prop_assert!(prr > 1.0 && ror_value > 1.0);
        } else if ad < bc {
            prop_assert!(prr < 1.0 && ror_value < 1.0);
        }
    }
}
