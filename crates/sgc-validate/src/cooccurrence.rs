//! The co-occurrence schema validator.
//!
//! Duplicate detection treats (A, B) and (B, A) as the same pair: the two
//! codes are sorted before the duplicate key is computed.

use std::collections::BTreeSet;

use sgc_ingest::{RowTable, zero_suppressed_column};
use sgc_model::{CoOccurrenceMapping, pair_key, split_pair_key};

use crate::checks::{check_count_column, duplicate_values, join_messages, sample_list};

/// Validate a co-occurrence row set. Returns the accumulated error string,
/// or `None` when the file is acceptable. This path has no warnings.
pub fn validate_cooccurrence(
    table: &mut RowTable,
    mapping: &CoOccurrenceMapping,
    valid_codes: &BTreeSet<String>,
) -> Option<String> {
    let missing: Vec<&str> = mapping
        .required_columns()
        .into_iter()
        .filter(|column| !table.has_column(column))
        .collect();
    if !missing.is_empty() {
        return Some(format!("Missing required columns: {}", missing.join(", ")));
    }

    zero_suppressed_column(table, &mapping.cooccurrence_count);

    let mut errors = Vec::new();

    for column in [&mapping.phenotype1, &mapping.phenotype2] {
        if table.column_values(column).any(str::is_empty) {
            errors.push(format!("Column '{column}' contains empty values"));
        }
    }

    for column in [&mapping.phenotype1, &mapping.phenotype2] {
        let invalid: Vec<&str> = table
            .column_values(column)
            .filter(|code| !code.is_empty() && !valid_codes.contains(*code))
            .collect();
        if !invalid.is_empty() {
            errors.push(format!(
                "Invalid phenotype codes in {column}: {}",
                sample_list(&invalid)
            ));
        }
    }

    let pair_keys = (0..table.height()).filter_map(|row| {
        let first = table.cell(row, &mapping.phenotype1).unwrap_or("");
        let second = table.cell(row, &mapping.phenotype2).unwrap_or("");
        if first.is_empty() || second.is_empty() {
            None
        } else {
            Some(pair_key(first, second))
        }
    });
    let duplicates: Vec<String> = duplicate_values(pair_keys)
        .into_iter()
        .map(|key| {
            let (first, second) = split_pair_key(&key);
            format!("({first}, {second})")
        })
        .collect();
    if !duplicates.is_empty() {
        errors.push(format!(
            "Duplicate phenotype pairs found: {}",
            sample_list(&duplicates)
        ));
    }

    if let Some(error) = check_count_column(table, &mapping.cooccurrence_count) {
        errors.push(error);
    }

    join_messages(errors)
}
