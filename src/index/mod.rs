//! Build-once aggregation index over a case table snapshot.
//!
//! A single pass over the table produces case-id lists keyed by drug, by
//! reaction, and by observed (drug, reaction) pair, so every 2x2 contingency
//! table can be answered from list sizes instead of rescanning the cases.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::cases::CaseTable,
    error::{EngineError, Result},
};

/// Identifier of the dataset snapshot an index was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetVersion(pub u64);

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The four cells of a drug-by-reaction 2x2 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyCell {
    /// drug and reaction
    pub a: u64,
    /// drug without reaction
    pub b: u64,
    /// reaction without drug
    pub c: u64,
    /// neither
    pub d: u64,
}

impl ContingencyCell {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// Derive the table from the co-occurrence count and the margins.
    /// Returns `None` when the margins are inconsistent with `n`.
    pub fn from_margins(a: u64, drug_total: u64, reaction_total: u64, n: u64) -> Option<Self> {
        let b = drug_total.checked_sub(a)?;
        let c = reaction_total.checked_sub(a)?;
        let d = n.checked_sub(a + b + c)?;
        Some(Self { a, b, c, d })
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    pub fn drug_total(&self) -> u64 {
        self.a + self.b
    }

    pub fn reaction_total(&self) -> u64 {
        self.a + self.c
    }

    pub fn min_cell(&self) -> u64 {
        self.a.min(self.b).min(self.c).min(self.d)
    }
}

/// Row positions into the [`CaseTable`], ascending.
pub type CaseRows = Vec<u32>;

/// Immutable index over one case table snapshot.
#[derive(Debug)]
pub struct AggregationIndex {
    version: DatasetVersion,
    total_cases: u64,
    by_drug: IndexMap<String, CaseRows>,
    by_reaction: IndexMap<String, CaseRows>,
    by_pair: IndexMap<(String, String), CaseRows>,
    table: Arc<CaseTable>,
}

impl AggregationIndex {
    /// Single linear pass over the table.
    pub fn build(table: Arc<CaseTable>) -> Self {
        let mut by_drug: IndexMap<String, CaseRows> = IndexMap::new();
        let mut by_reaction: IndexMap<String, CaseRows> = IndexMap::new();
        let mut by_pair: IndexMap<(String, String), CaseRows> = IndexMap::new();

        for (row, (drugs, reactions)) in table.drugs().iter().zip(table.reactions()).enumerate() {
            let row = row as u32;
            for drug in drugs {
                by_drug.entry(drug.clone()).or_default().push(row);
            }
            for reaction in reactions {
                by_reaction.entry(reaction.clone()).or_default().push(row);
            }
            for drug in drugs {
                for reaction in reactions {
                    by_pair
                        .entry((drug.clone(), reaction.clone()))
                        .or_default()
                        .push(row);
                }
            }
        }

        let index = Self {
            version: table.version(),
            total_cases: table.len() as u64,
            by_drug,
            by_reaction,
            by_pair,
            table,
        };
        info!(
            version = %index.version,
            cases = index.total_cases,
            drugs = index.by_drug.len(),
            reactions = index.by_reaction.len(),
            pairs = index.by_pair.len(),
            "built aggregation index"
        );
        index
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn total_cases(&self) -> u64 {
        self.total_cases
    }

    pub fn table(&self) -> &CaseTable {
        &self.table
    }

    /// Fail with [`EngineError::IndexStale`] unless this index was built from `expected`.
    pub fn ensure_version(&self, expected: DatasetVersion) -> Result<()> {
        if self.version == expected {
            Ok(())
        } else {
            Err(EngineError::IndexStale {
                expected,
                actual: self.version,
            })
        }
    }

    pub fn unique_drugs(&self) -> impl Iterator<Item = &str> {
        self.by_drug.keys().map(String::as_str)
    }

    pub fn unique_reactions(&self) -> impl Iterator<Item = &str> {
        self.by_reaction.keys().map(String::as_str)
    }

    pub fn drug_count(&self, drug: &str) -> u64 {
        self.by_drug.get(drug).map_or(0, |rows| rows.len() as u64)
    }

    pub fn reaction_count(&self, reaction: &str) -> u64 {
        self.by_reaction.get(reaction).map_or(0, |rows| rows.len() as u64)
    }

    /// Observed pairs in first-co-occurrence order, with their case rows.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, &[u32])> {
        self.by_pair
            .iter()
            .map(|((drug, reaction), rows)| (drug.as_str(), reaction.as_str(), rows.as_slice()))
    }

    pub fn pair_count(&self) -> usize {
        self.by_pair.len()
    }

    /// Case rows reporting both the drug and the reaction.
    pub fn pair_rows(&self, drug: &str, reaction: &str) -> Vec<u32> {
        if let Some(rows) = self.by_pair.get(&(drug.to_string(), reaction.to_string())) {
            return rows.clone();
        }
        match (self.by_drug.get(drug), self.by_reaction.get(reaction)) {
            (Some(drug_rows), Some(reaction_rows)) => intersect(drug_rows, reaction_rows),
            _ => Vec::new(),
        }
    }

    /// 2x2 table for any (drug, reaction), observed together or not.
    pub fn lookup_pair(&self, drug: &str, reaction: &str) -> ContingencyCell {
        let drug_rows = self.by_drug.get(drug).map_or(&[][..], Vec::as_slice);
        let reaction_rows = self.by_reaction.get(reaction).map_or(&[][..], Vec::as_slice);
        let a = match self.by_pair.get(&(drug.to_string(), reaction.to_string())) {
            Some(rows) => rows.len() as u64,
            None => intersect_count(drug_rows, reaction_rows),
        };
        let b = drug_rows.len() as u64 - a;
        let c = reaction_rows.len() as u64 - a;
        ContingencyCell {
            a,
            b,
            c,
            d: self.total_cases - a - b - c,
        }
    }
}

/// Walk the shorter sorted list and binary-search the longer one.
fn intersect_count(left: &[u32], right: &[u32]) -> u64 {
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    short
        .iter()
        .filter(|row| long.binary_search(*row).is_ok())
        .count() as u64
}

fn intersect(left: &[u32], right: &[u32]) -> Vec<u32> {
    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    short
        .iter()
        .copied()
        .filter(|row| long.binary_search(row).is_ok())
        .collect()
}

/// Shared slot holding the current index.
///
/// Rebuilds construct the new index outside the lock and swap it in under the
/// write lock, so a reader sees either the old index or the complete new one.
/// Readers hold an `Arc` for the length of their run and are unaffected by a
/// later swap.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    slot: Arc<RwLock<Arc<AggregationIndex>>>,
}

impl IndexHandle {
    pub fn new(table: Arc<CaseTable>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(AggregationIndex::build(table)))),
        }
    }

    /// Current snapshot, whatever its version.
    pub fn snapshot(&self) -> Arc<AggregationIndex> {
        match self.slot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Current snapshot, provided it was built from `expected`.
    pub fn snapshot_for(&self, expected: DatasetVersion) -> Result<Arc<AggregationIndex>> {
        let snapshot = self.snapshot();
        snapshot.ensure_version(expected)?;
        Ok(snapshot)
    }

    /// Build an index for `table` and atomically make it current.
    pub fn rebuild(&self, table: Arc<CaseTable>) -> Arc<AggregationIndex> {
        let fresh = Arc::new(AggregationIndex::build(table));
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!(old = %guard.version(), new = %fresh.version(), "swapped aggregation index");
        *guard = Arc::clone(&fresh);
        fresh
    }
}
