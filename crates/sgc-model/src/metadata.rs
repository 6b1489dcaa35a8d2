#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Case and control counts recorded for a single phenotype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenotypeCounts {
    pub cases: i64,
    pub controls: i64,
}

/// Aggregates derived from a validated cases/controls file.
///
/// Stored against the owning file record and destroyed with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasesControlsMetadata {
    /// Order-preserving de-duplication of the phenotype column.
    pub distinct_phenotypes: Vec<String>,
    pub total_cases: i64,
    pub total_controls: i64,
    /// Last valid (cases, controls) pair seen per phenotype.
    pub phenotype_counts: BTreeMap<String, PhenotypeCounts>,
}

impl CasesControlsMetadata {
    /// Grand total of cases plus controls, compared against the cohort's
    /// declared sample sizes.
    pub fn grand_total(&self) -> i64 {
        self.total_cases.saturating_add(self.total_controls)
    }
}

/// Aggregates derived from a validated co-occurrence file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoOccurrenceMetadata {
    /// Sorted union of both phenotype columns.
    pub distinct_phenotypes: Vec<String>,
    /// Row count, not the sum of co-occurrence values.
    pub total_pairs: u64,
    pub total_cooccurrence_count: i64,
    /// Keyed by `pair_key`; last write wins on duplicate pairs.
    pub phenotype_pair_counts: BTreeMap<String, i64>,
}

impl CoOccurrenceMetadata {
    pub fn max_pair_count(&self) -> i64 {
        self.phenotype_pair_counts.values().copied().max().unwrap_or(0)
    }
}

/// Canonical key for an unordered phenotype pair: the two codes in sorted
/// order joined by a pipe, so (A, B) and (B, A) collide.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

/// Split a `pair_key` back into its two codes.
pub fn split_pair_key(key: &str) -> (&str, &str) {
    key.split_once('|').unwrap_or((key, ""))
}
