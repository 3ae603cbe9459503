//! Case records and their columnar presentation.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::index::DatasetVersion;

/// Most severe reported outcome of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    None,
    Hospitalization,
    Disability,
    LifeThreatening,
    Death,
}

impl Outcome {
    /// Parse the outcome codes and labels commonly found in spontaneous report exports.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "death" | "de" | "died" | "fatal" => Self::Death,
            "life-threatening" | "life_threatening" | "life threatening" | "lt" => {
                Self::LifeThreatening
            }
            "hospitalization" | "hospitalisation" | "hospitalized" | "ho" => Self::Hospitalization,
            "disability" | "ds" => Self::Disability,
            _ => Self::None,
        }
    }
}

/// One adverse-event report as produced by the ingestion layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub drugs: Vec<String>,
    pub reactions: Vec<String>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub indication: Option<String>,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub serious: bool,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub onset_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Which optional columns the source table actually carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub event_date: bool,
    pub age: bool,
    pub sex: bool,
    pub region: bool,
    pub indication: bool,
    pub dose: bool,
    pub weight: bool,
    pub serious: bool,
    pub outcome: bool,
    pub onset_date: bool,
    pub start_date: bool,
}

impl ColumnSet {
    pub fn all() -> Self {
        Self {
            event_date: true,
            age: true,
            sex: true,
            region: true,
            indication: true,
            dose: true,
            weight: true,
            serious: true,
            outcome: true,
            onset_date: true,
            start_date: true,
        }
    }

    /// Infer optional-column presence from whether any record carries a value.
    /// `serious` and `outcome` are not optional on [`Case`], so they always count as present.
    fn observed(cases: &[Case]) -> Self {
        let mut set = Self {
            serious: true,
            outcome: true,
            ..Self::default()
        };
        for case in cases {
            set.event_date |= case.event_date.is_some();
            set.age |= case.age.is_some();
            set.sex |= case.sex.is_some();
            set.region |= case.region.is_some();
            set.indication |= case.indication.is_some();
            set.dose |= case.dose.is_some();
            set.weight |= case.weight.is_some();
            set.onset_date |= case.onset_date.is_some();
            set.start_date |= case.start_date.is_some();
        }
        set
    }
}

/// Normalise a drug or reaction term for indexing.
pub fn normalize_term(raw: &str) -> Option<String> {
    let term = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if term.is_empty() {
        None
    } else {
        Some(term.to_lowercase())
    }
}

fn normalize_terms(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|value| normalize_term(value))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Immutable, column-oriented view of the case set for one dataset version.
#[derive(Debug, Clone)]
pub struct CaseTable {
    version: DatasetVersion,
    columns: ColumnSet,
    duplicate_ids: usize,
    case_ids: Vec<String>,
    drugs: Vec<Vec<String>>,
    reactions: Vec<Vec<String>>,
    event_date: Vec<Option<NaiveDate>>,
    age: Vec<Option<f64>>,
    sex: Vec<Option<String>>,
    region: Vec<Option<String>>,
    indication: Vec<Option<String>>,
    dose: Vec<Option<String>>,
    weight: Vec<Option<f64>>,
    serious: Vec<bool>,
    outcome: Vec<Outcome>,
    onset_date: Vec<Option<NaiveDate>>,
    start_date: Vec<Option<NaiveDate>>,
}

impl CaseTable {
    /// Build a table, inferring optional-column presence from the records.
    pub fn from_cases(version: DatasetVersion, cases: Vec<Case>) -> Self {
        let columns = ColumnSet::observed(&cases);
        Self::with_columns(version, columns, cases)
    }

    /// Build a table with explicit optional-column presence.
    ///
    /// Records with no usable drug or reaction term are dropped.
    pub fn with_columns(version: DatasetVersion, columns: ColumnSet, cases: Vec<Case>) -> Self {
        let mut table = Self {
            version,
            columns,
            duplicate_ids: 0,
            case_ids: Vec::with_capacity(cases.len()),
            drugs: Vec::with_capacity(cases.len()),
            reactions: Vec::with_capacity(cases.len()),
            event_date: Vec::with_capacity(cases.len()),
            age: Vec::with_capacity(cases.len()),
            sex: Vec::with_capacity(cases.len()),
            region: Vec::with_capacity(cases.len()),
            indication: Vec::with_capacity(cases.len()),
            dose: Vec::with_capacity(cases.len()),
            weight: Vec::with_capacity(cases.len()),
            serious: Vec::with_capacity(cases.len()),
            outcome: Vec::with_capacity(cases.len()),
            onset_date: Vec::with_capacity(cases.len()),
            start_date: Vec::with_capacity(cases.len()),
        };
        let mut dropped = 0usize;
        let mut seen: HashSet<String> = HashSet::with_capacity(cases.len());
        for case in cases {
            let drugs = normalize_terms(&case.drugs);
            let reactions = normalize_terms(&case.reactions);
            if drugs.is_empty() || reactions.is_empty() {
                dropped += 1;
                continue;
            }
            if !seen.insert(case.case_id.clone()) {
                table.duplicate_ids += 1;
            }
            table.case_ids.push(case.case_id);
            table.drugs.push(drugs);
            table.reactions.push(reactions);
            table.event_date.push(case.event_date);
            table.age.push(case.age);
            table.sex.push(case.sex);
            table.region.push(case.region);
            table.indication.push(case.indication);
            table.dose.push(case.dose);
            table.weight.push(case.weight);
            table.serious.push(case.serious);
            table.outcome.push(case.outcome);
            table.onset_date.push(case.onset_date);
            table.start_date.push(case.start_date);
        }
        if dropped > 0 {
            warn!(dropped, "dropped cases without drug or reaction terms");
        }
        if table.duplicate_ids > 0 {
            warn!(
                duplicates = table.duplicate_ids,
                "case ids repeat; each repeated report is counted separately"
            );
        }
        table
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn columns(&self) -> ColumnSet {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }

    /// Rows whose case id already appeared earlier in the table.
    pub fn duplicate_case_ids(&self) -> usize {
        self.duplicate_ids
    }

    pub fn case_ids(&self) -> &[String] {
        &self.case_ids
    }

    pub fn drugs(&self) -> &[Vec<String>] {
        &self.drugs
    }

    pub fn reactions(&self) -> &[Vec<String>] {
        &self.reactions
    }

    pub fn event_date(&self) -> &[Option<NaiveDate>] {
        &self.event_date
    }

    pub fn age(&self) -> &[Option<f64>] {
        &self.age
    }

    pub fn sex(&self) -> &[Option<String>] {
        &self.sex
    }

    pub fn region(&self) -> &[Option<String>] {
        &self.region
    }

    pub fn indication(&self) -> &[Option<String>] {
        &self.indication
    }

    pub fn dose(&self) -> &[Option<String>] {
        &self.dose
    }

    pub fn weight(&self) -> &[Option<f64>] {
        &self.weight
    }

    pub fn serious(&self) -> &[bool] {
        &self.serious
    }

    pub fn outcome(&self) -> &[Outcome] {
        &self.outcome
    }

    pub fn onset_date(&self) -> &[Option<NaiveDate>] {
        &self.onset_date
    }

    pub fn start_date(&self) -> &[Option<NaiveDate>] {
        &self.start_date
    }

    /// Latest event date across the whole table.
    pub fn latest_event_date(&self) -> Option<NaiveDate> {
        self.event_date.iter().flatten().max().copied()
    }
}

/// Holder of the current case table; every replacement gets a fresh version.
#[derive(Debug)]
pub struct CaseStore {
    current: RwLock<Arc<CaseTable>>,
    next_version: AtomicU64,
}

impl Default for CaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CaseTable::from_cases(
                DatasetVersion(0),
                Vec::new(),
            ))),
            next_version: AtomicU64::new(1),
        }
    }

    /// Allocate the version number for the next table loaded into this store.
    pub fn allocate_version(&self) -> DatasetVersion {
        DatasetVersion(self.next_version.fetch_add(1, Ordering::SeqCst))
    }

    /// Replace the case set, returning the new table.
    pub fn replace(&self, cases: Vec<Case>) -> Arc<CaseTable> {
        let table = CaseTable::from_cases(self.allocate_version(), cases);
        self.install(table)
    }

    /// Install an already-built table (e.g. one produced by the file loader).
    pub fn install(&self, table: CaseTable) -> Arc<CaseTable> {
        let table = Arc::new(table);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!(version = %table.version(), cases = table.len(), "installed case table");
        *guard = Arc::clone(&table);
        table
    }

    pub fn current(&self) -> Arc<CaseTable> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}
