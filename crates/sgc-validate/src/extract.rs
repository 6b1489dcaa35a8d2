//! Metadata extraction from validated row sets.
//!
//! Extraction assumes the suppressed-value normalizer has already run (the
//! validators and the combiner both run it in place), and additionally
//! coerces anything unparseable to zero so totals never fail.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sgc_ingest::{RowTable, coerce_count, parse_number, zero_suppressed};
use sgc_model::{
    CasesControlsMapping, CasesControlsMetadata, CoOccurrenceMapping, CoOccurrenceMetadata,
    PhenotypeCounts, pair_key,
};

/// Aggregate a validated cases/controls table.
///
/// The per-phenotype map records the last parseable (cases, controls) pair
/// seen for each code; later rows overwrite earlier ones. That tolerance is
/// deliberate, matching the duplicate check's role as the gatekeeper.
pub fn extract_cases_controls_metadata(
    table: &RowTable,
    mapping: &CasesControlsMapping,
) -> CasesControlsMetadata {
    let mut distinct = Vec::new();
    let mut seen = HashSet::new();
    let mut total_cases = 0i64;
    let mut total_controls = 0i64;
    let mut phenotype_counts: BTreeMap<String, PhenotypeCounts> = BTreeMap::new();

    for row in 0..table.height() {
        let phenotype = table.cell(row, &mapping.phenotype).unwrap_or("");
        let cases_raw = table.cell(row, &mapping.cases).unwrap_or("");
        let controls_raw = table.cell(row, &mapping.controls).unwrap_or("");

        // Totals saturate rather than wrap; the count chain accepts
        // arbitrarily large integer tokens.
        total_cases = total_cases.saturating_add(coerce_count(cases_raw));
        total_controls = total_controls.saturating_add(coerce_count(controls_raw));

        if phenotype.is_empty() {
            continue;
        }
        if seen.insert(phenotype.to_string()) {
            distinct.push(phenotype.to_string());
        }

        let cases = parse_number(zero_suppressed(cases_raw));
        let controls = parse_number(zero_suppressed(controls_raw));
        if let (Some(cases), Some(controls)) = (cases, controls) {
            phenotype_counts.insert(
                phenotype.to_string(),
                PhenotypeCounts {
                    cases: cases as i64,
                    controls: controls as i64,
                },
            );
        }
    }

    CasesControlsMetadata {
        distinct_phenotypes: distinct,
        total_cases,
        total_controls,
        phenotype_counts,
    }
}

/// Aggregate a validated co-occurrence table.
///
/// `total_pairs` is the row count, not the sum of the count column; the
/// distinct phenotype list is the sorted union of both code columns.
pub fn extract_cooccurrence_metadata(
    table: &RowTable,
    mapping: &CoOccurrenceMapping,
) -> CoOccurrenceMetadata {
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    let mut total = 0i64;
    let mut phenotype_pair_counts: BTreeMap<String, i64> = BTreeMap::new();

    for row in 0..table.height() {
        let first = table.cell(row, &mapping.phenotype1).unwrap_or("");
        let second = table.cell(row, &mapping.phenotype2).unwrap_or("");
        let count_raw = table.cell(row, &mapping.cooccurrence_count).unwrap_or("");

        total = total.saturating_add(coerce_count(count_raw));

        if !first.is_empty() {
            distinct.insert(first.to_string());
        }
        if !second.is_empty() {
            distinct.insert(second.to_string());
        }

        if !first.is_empty()
            && !second.is_empty()
            && let Some(count) = parse_number(zero_suppressed(count_raw))
        {
            phenotype_pair_counts.insert(pair_key(first, second), count as i64);
        }
    }

    CoOccurrenceMetadata {
        distinct_phenotypes: distinct.into_iter().collect(),
        total_pairs: table.height() as u64,
        total_cooccurrence_count: total,
        phenotype_pair_counts,
    }
}

/// Mapping for a combined file, taken from the first three columns
/// positionally. `None` when the table is too narrow.
pub fn positional_cases_controls_mapping(table: &RowTable) -> Option<CasesControlsMapping> {
    let [phenotype, cases, controls, ..] = table.headers.as_slice() else {
        return None;
    };
    Some(CasesControlsMapping {
        phenotype: phenotype.clone(),
        cases: cases.clone(),
        controls: controls.clone(),
        breakdown: table.headers.get(3).cloned(),
    })
}

/// Positional mapping for a combined co-occurrence file.
pub fn positional_cooccurrence_mapping(table: &RowTable) -> Option<CoOccurrenceMapping> {
    let [phenotype1, phenotype2, count, ..] = table.headers.as_slice() else {
        return None;
    };
    Some(CoOccurrenceMapping {
        phenotype1: phenotype1.clone(),
        phenotype2: phenotype2.clone(),
        cooccurrence_count: count.clone(),
    })
}
