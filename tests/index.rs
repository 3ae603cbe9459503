mod common;

use std::sync::Arc;

use proptest::prelude::*;
use signal_ranker::{
    config::EngineConfig,
    data::cases::CaseStore,
    error::EngineError,
    index::{AggregationIndex, ContingencyCell, DatasetVersion, IndexHandle},
    signals::SignalEngine,
};

#[test]
fn reference_cell_from_cases() {
    let index = AggregationIndex::build(common::table(1, common::reference_cases()));
    let cell = index.lookup_pair("x", "y");
    assert_eq!(cell, ContingencyCell::new(100, 900, 500, 8500));
    assert_eq!(index.pair_count(), 4);
    assert_eq!(index.lookup_pair("x", "unknown"), ContingencyCell::new(0, 1000, 0, 9000));
}

#[test]
fn terms_are_normalised_and_deduplicated() {
    let cases = vec![
        common::case(0, &["Aspirin", "  aspirin "], &["Nausea"]),
        common::case(1, &["ASPIRIN"], &["nausea", "Rash"]),
        common::case(2, &[""], &["rash"]),
    ];
    let index = AggregationIndex::build(common::table(1, cases));
    assert_eq!(index.total_cases(), 2);
    assert_eq!(index.drug_count("aspirin"), 2);
    assert_eq!(index.lookup_pair("aspirin", "nausea").a, 2);
}

#[test]
fn rebuilding_the_same_cases_is_idempotent() {
    let table = common::table(7, common::reference_cases());
    let first = AggregationIndex::build(Arc::clone(&table));
    let second = AggregationIndex::build(table);
    let lhs: Vec<_> = first.pairs().map(|(d, r, rows)| (d.to_string(), r.to_string(), rows.to_vec())).collect();
    let rhs: Vec<_> = second.pairs().map(|(d, r, rows)| (d.to_string(), r.to_string(), rows.to_vec())).collect();
    assert_eq!(lhs, rhs);
    for (drug, reaction, _) in &lhs {
        assert_eq!(first.lookup_pair(drug, reaction), second.lookup_pair(drug, reaction));
    }
}

#[test]
fn stale_version_is_rejected() {
    let store = CaseStore::new();
    let v1 = store.replace(vec![common::case(0, &["a"], &["b"])]);
    let engine = SignalEngine::new(Arc::clone(&v1), EngineConfig::default()).unwrap();
    assert!(engine.run(v1.version()).is_ok());

    let v2 = store.replace(vec![common::case(0, &["a"], &["b"]), common::case(1, &["a"], &["c"])]);
    assert_eq!(engine.rebuild(Arc::clone(&v2)), v2.version());
    match engine.run(v1.version()) {
        Err(EngineError::IndexStale { expected, actual }) => {
            assert_eq!(expected, v1.version());
            assert_eq!(actual, v2.version());
        }
        other => panic!("expected IndexStale, got {other:?}"),
    }
    assert_eq!(engine.run(v2.version()).unwrap().total_cases, 2);
}

#[test]
fn held_snapshots_survive_a_rebuild() {
    let handle = IndexHandle::new(common::table(1, vec![common::case(0, &["a"], &["b"])]));
    let held = handle.snapshot();
    handle.rebuild(common::table(2, common::reference_cases()));
    assert_eq!(held.version(), DatasetVersion(1));
    assert_eq!(held.total_cases(), 1);
    assert_eq!(handle.snapshot().version(), DatasetVersion(2));
    assert!(handle.snapshot_for(DatasetVersion(1)).is_err());
}

fn arb_cases() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(0usize..4, 1..3),
            prop::collection::vec(0usize..4, 1..3),
        ),
        1..60,
    )
}

proptest! {
    #[test]
    fn every_cell_sums_to_the_case_total(raw in arb_cases()) {
        const DRUGS: [&str; 4] = ["d0", "d1", "d2", "d3"];
        const REACTIONS: [&str; 4] = ["r0", "r1", "r2", "r3"];
        let cases = raw
            .iter()
            .enumerate()
            .map(|(id, (drugs, reactions))| {
                let drugs: Vec<&str> = drugs.iter().map(|i| DRUGS[*i]).collect();
                let reactions: Vec<&str> = reactions.iter().map(|i| REACTIONS[*i]).collect();
                common::case(id, &drugs, &reactions)
            })
            .collect();
        let index = AggregationIndex::build(common::table(1, cases));
        prop_assert_eq!(index.total_cases(), raw.len() as u64);
        for drug in DRUGS {
            for reaction in REACTIONS {
                let cell = index.lookup_pair(drug, reaction);
                prop_assert_eq!(cell.total(), index.total_cases());
                prop_assert_eq!(cell.a, index.pair_rows(drug, reaction).len() as u64);
            }
        }
    }
}

#[test]
fn unique_terms_come_back_normalised_in_first_seen_order() {
    let cases = vec![
        common::case(0, &["Zeta", "alpha"], &["Rash"]),
        common::case(1, &["ALPHA", " beta "], &["nausea", "rash"]),
    ];
    let index = AggregationIndex::build(common::table(1, cases));
    assert_eq!(index.unique_drugs().collect::<Vec<_>>(), ["zeta", "alpha", "beta"]);
    assert_eq!(index.unique_reactions().collect::<Vec<_>>(), ["rash", "nausea"]);
}

#[test]
fn store_serves_the_latest_table() {
    let store = CaseStore::new();
    assert_eq!(store.current().version(), DatasetVersion(0));
    assert!(store.current().is_empty());

    let installed = store.replace(vec![common::case(0, &["a"], &["b"])]);
    let current = store.current();
    assert!(Arc::ptr_eq(&installed, &current));
    assert_eq!(current.version(), DatasetVersion(1));
    assert_eq!(current.drugs(), &[vec!["a".to_string()]]);
}

#[test]
fn repeated_case_ids_are_reported() {
    let cases = vec![
        common::case(0, &["a"], &["b"]),
        common::case(0, &["a"], &["b"]),
        common::case(1, &["a"], &["c"]),
    ];
    let table = common::table(1, cases);
    assert_eq!(table.duplicate_case_ids(), 1);
    assert_eq!(table.case_ids(), ["c0", "c0", "c1"]);
    let index = AggregationIndex::build(table);
    assert_eq!(index.lookup_pair("a", "b").a, 2);
}
