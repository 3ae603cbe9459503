mod common;

use signal_ranker::{
    config::EngineConfig,
    index::AggregationIndex,
    signals::{self, report},
};

#[test]
fn saved_report_round_trips_and_flattens() {
    let index = AggregationIndex::build(common::table(1, common::reference_cases()));
    let analysis = signals::analyze(&index, &EngineConfig::default());
    let dir = tempfile::tempdir().unwrap();

    let json = dir.path().join("out/signals.json");
    report::write_json(&analysis, &json).unwrap();
    let restored = report::read_json(&json).unwrap();
    assert_eq!(restored.dataset_version, analysis.dataset_version);
    assert_eq!(restored.candidates.len(), analysis.candidates.len());
    for (saved, live) in restored.candidates.iter().zip(&analysis.candidates) {
        assert_eq!((&saved.drug, &saved.reaction), (&live.drug, &live.reaction));
        assert_eq!(saved.quantum_rank, live.quantum_rank);
        assert_eq!(saved.quantum.bonuses.len(), live.quantum.bonuses.len());
        assert!((saved.quantum.score - live.quantum.score).abs() < 1e-12);
        assert_eq!(saved.statistics.cell, live.statistics.cell);
        assert_eq!(saved.trend.is_some(), live.trend.is_some());
    }

    let frame = report::ranked_frame(&analysis.candidates).unwrap();
    assert_eq!(frame.height(), 4);
    assert!(frame.column("ebgm").is_ok());

    let csv = dir.path().join("out/signals.csv");
    report::write_csv(&analysis.candidates, &csv).unwrap();
    let text = std::fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("quantum_rank,classical_rank,drug,reaction"));
    assert_eq!(lines.count(), 4);
}
