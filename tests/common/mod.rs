#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use signal_ranker::{
    data::cases::{Case, CaseTable},
    index::DatasetVersion,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn case(id: usize, drugs: &[&str], reactions: &[&str]) -> Case {
    Case {
        case_id: format!("c{id}"),
        drugs: drugs.iter().map(|d| d.to_string()).collect(),
        reactions: reactions.iter().map(|r| r.to_string()).collect(),
        ..Case::default()
    }
}

pub fn dated(id: usize, drug: &str, reaction: &str, on: NaiveDate) -> Case {
    Case {
        event_date: Some(on),
        ..case(id, &[drug], &[reaction])
    }
}

pub fn table(version: u64, cases: Vec<Case>) -> Arc<CaseTable> {
    Arc::new(CaseTable::from_cases(DatasetVersion(version), cases))
}

/// 100 X+Y, 900 X only, 500 Y only, 8500 neither.
pub fn reference_cases() -> Vec<Case> {
    let mut cases = Vec::with_capacity(10_000);
    let mut push = |n: usize, drug: &str, reaction: &str| {
        for _ in 0..n {
            let id = cases.len();
            cases.push(case(id, &[drug], &[reaction]));
        }
    };
    push(100, "x", "y");
    push(900, "x", "z");
    push(500, "w", "y");
    push(8500, "w", "z");
    cases
}
