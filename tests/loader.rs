use std::io::Write;

use chrono::NaiveDate;
use signal_ranker::{
    data::{cases::Outcome, loader::load_case_table},
    error::EngineError,
    index::{AggregationIndex, DatasetVersion},
};
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_aliased_columns_and_multi_valued_cells() {
    let file = csv_file(
        "primaryid,drugname,pt,event_dt,age,gender,outc_cod\n\
         1,Aspirin; Warfarin,Bleeding|Bruising,20240115,67,f,DE\n\
         2,aspirin,Nausea,2024-02-01,,M,\n\
         3,,Rash,2024-02-03,40,F,\n\
         4,Metformin,Lactic Acidosis,not-a-date,55,M,HO\n",
    );
    let table = load_case_table(file.path(), DatasetVersion(3)).unwrap();
    assert_eq!(table.version(), DatasetVersion(3));
    assert_eq!(table.len(), 3);
    assert_eq!(table.drugs()[0], vec!["aspirin", "warfarin"]);
    assert_eq!(table.reactions()[0], vec!["bleeding", "bruising"]);
    assert_eq!(table.event_date()[0], NaiveDate::from_ymd_opt(2024, 1, 15));
    assert_eq!(table.event_date()[2], None);
    assert_eq!(table.sex()[0].as_deref(), Some("F"));
    assert_eq!(table.age()[1], None);
    assert_eq!(table.outcome()[0], Outcome::Death);
    assert_eq!(table.outcome()[2], Outcome::Hospitalization);

    // No seriousness column: only the fatal case counts as serious.
    assert_eq!(table.serious(), &[true, false, false]);
    let columns = table.columns();
    assert!(columns.sex && columns.age && !columns.region && !columns.serious);

    let index = AggregationIndex::build(std::sync::Arc::new(table));
    assert_eq!(index.drug_count("aspirin"), 2);
    assert_eq!(index.lookup_pair("warfarin", "bleeding").a, 1);
}

#[test]
fn explicit_seriousness_column_wins() {
    let file = csv_file(
        "case_id,drug,reaction,serious,outcome\n\
         a,X,Y,N,death\n\
         b,X,Z,Y,\n",
    );
    let table = load_case_table(file.path(), DatasetVersion(1)).unwrap();
    assert_eq!(table.serious(), &[false, true]);
}

#[test]
fn missing_required_columns_fail_to_load() {
    let file = csv_file("case_id,drug\n1,X\n");
    match load_case_table(file.path(), DatasetVersion(1)) {
        Err(EngineError::Load(message)) => assert!(message.contains("reaction")),
        other => panic!("expected load error, got {other:?}"),
    }
}
