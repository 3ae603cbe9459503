use std::io::Write;

use signal_ranker::{
    config::{EngineConfig, TrendPeriod},
    error::EngineError,
};

#[test]
fn json_file_overrides_selected_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"top_n": 5, "trend_period": "quarter", "component_weights": {{"rarity": 0.25, "seriousness": 0.25, "recency": 0.25, "count": 0.25}}}}"#
    )
    .unwrap();
    let config = EngineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.top_n, 5);
    assert_eq!(config.trend_period, TrendPeriod::Quarter);
    assert_eq!(config.z_threshold, 2.0);
    assert!(config.validate().is_ok());
}

#[test]
fn invalid_configurations_are_rejected_before_running() {
    let bad_weights = EngineConfig {
        component_weights: signal_ranker::signals::weights::ComponentWeights {
            rarity: 0.9,
            seriousness: 0.35,
            recency: 0.2,
            count: 0.05,
        },
        ..EngineConfig::default()
    };
    assert!(matches!(bad_weights.validate(), Err(EngineError::ConfigurationInvalid(_))));

    for config in [
        EngineConfig { top_n: 0, ..EngineConfig::default() },
        EngineConfig { subgroup_anomaly_threshold: 0.0, ..EngineConfig::default() },
        EngineConfig { emerging_lookback_days: -3, ..EngineConfig::default() },
        EngineConfig { early_detection_gap: 0, ..EngineConfig::default() },
        EngineConfig { z_threshold: f64::NAN, ..EngineConfig::default() },
    ] {
        assert!(config.validate().is_err(), "{config:?} should be rejected");
    }

    let table = std::sync::Arc::new(signal_ranker::data::cases::CaseTable::from_cases(
        signal_ranker::index::DatasetVersion(1),
        Vec::new(),
    ));
    assert!(signal_ranker::signals::SignalEngine::new(table, bad_weights).is_err());
}

#[test]
fn unknown_trend_period_is_an_error() {
    assert!("weekly".parse::<TrendPeriod>().is_err());
    assert_eq!("Quarterly".parse::<TrendPeriod>().unwrap(), TrendPeriod::Quarter);
}

#[test]
fn lookback_beyond_the_date_range_is_rejected_and_never_panics() {
    let config = EngineConfig {
        emerging_lookback_days: 1_000_000_000,
        ..EngineConfig::default()
    };
    assert!(matches!(config.validate(), Err(EngineError::ConfigurationInvalid(_))));
    let ceiling = EngineConfig {
        emerging_lookback_days: signal_ranker::config::MAX_LOOKBACK_DAYS,
        ..EngineConfig::default()
    };
    assert!(ceiling.validate().is_ok());

    // Unvalidated configs still degrade to a skipped analysis.
    let reference = chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let dates = vec![reference; 4];
    assert_eq!(
        signal_ranker::signals::trend::detect_emerging(&dates, 0, reference, &config),
        signal_ranker::signals::Analysis::Skipped(
            signal_ranker::signals::SkipReason::LookbackOutOfRange {
                lookback_days: 1_000_000_000
            }
        )
    );

    let cases = (0..4)
        .map(|i| signal_ranker::data::cases::Case {
            case_id: format!("c{i}"),
            drugs: vec!["a".into()],
            reactions: vec!["b".into()],
            event_date: Some(reference),
            ..Default::default()
        })
        .collect();
    let table = std::sync::Arc::new(signal_ranker::data::cases::CaseTable::from_cases(
        signal_ranker::index::DatasetVersion(1),
        cases,
    ));
    let index = signal_ranker::index::AggregationIndex::build(table);
    let report = signal_ranker::signals::analyze(&index, &config);
    assert_eq!(report.candidates.len(), 1);
}
