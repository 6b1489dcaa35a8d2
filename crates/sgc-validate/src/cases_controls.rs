//! The cases/controls schema validator.
//!
//! Runs the suppressed-value normalizer in place, then accumulates content
//! errors across all applicable checks so the uploader sees every problem in
//! one response. Only the missing-column check short-circuits.

use std::collections::BTreeSet;

use sgc_ingest::{RowTable, coerce_count, parse_number, zero_suppressed, zero_suppressed_column};
use sgc_model::CasesControlsMapping;

use crate::checks::{check_count_column, duplicate_values, join_messages, sample_list};

/// Outcome of validating one uploaded file. A non-null error rejects the
/// upload; warnings are surfaced but never block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileValidation {
    pub error: Option<String>,
    pub warning: Option<String>,
}

impl FileValidation {
    pub fn rejected(error: String) -> Self {
        Self {
            error: Some(error),
            warning: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}

/// Validate a cases/controls row set against its uploader-supplied mapping
/// and the registry of valid phenotype codes.
///
/// Normalizes the `cases` and `controls` columns in place; all later checks
/// and any subsequent extraction see the normalized view.
pub fn validate_cases_controls(
    table: &mut RowTable,
    mapping: &CasesControlsMapping,
    valid_codes: &BTreeSet<String>,
) -> FileValidation {
    let missing: Vec<&str> = mapping
        .required_columns()
        .into_iter()
        .filter(|column| !table.has_column(column))
        .collect();
    if !missing.is_empty() {
        return FileValidation::rejected(format!(
            "Missing required columns: {}",
            missing.join(", ")
        ));
    }

    zero_suppressed_column(table, &mapping.cases);
    zero_suppressed_column(table, &mapping.controls);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let phenotypes: Vec<String> = table
        .column_values(&mapping.phenotype)
        .map(str::to_string)
        .collect();
    if phenotypes.iter().any(|code| code.is_empty()) {
        errors.push(format!(
            "Column '{}' contains empty values",
            mapping.phenotype
        ));
    }

    let invalid: Vec<&String> = phenotypes
        .iter()
        .filter(|code| !code.is_empty() && !valid_codes.contains(*code))
        .collect();
    if !invalid.is_empty() {
        errors.push(format!(
            "Invalid phenotype codes: {}",
            sample_list(&invalid)
        ));
    }

    let duplicates = duplicate_values(phenotypes.iter().filter(|c| !c.is_empty()).cloned());
    if !duplicates.is_empty() {
        errors.push(format!(
            "Duplicate phenotypes found: {}",
            sample_list(&duplicates)
        ));
    }

    if let Some(error) = check_count_column(table, &mapping.cases) {
        errors.push(error);
    }
    if let Some(error) = check_count_column(table, &mapping.controls) {
        errors.push(error);
    }

    if let Some(breakdown_column) = mapping.breakdown.as_deref()
        && table.has_column(breakdown_column)
    {
        check_breakdowns(table, mapping, breakdown_column, &mut errors, &mut warnings);
    }

    FileValidation {
        error: join_messages(errors),
        warning: join_messages(warnings),
    }
}

/// Check the optional `CODE:COUNT;...` breakdown column row by row.
///
/// A breakdown count may itself be suppressed (treated as zero). A count
/// above the row's cases total is an error; a positive breakdown sum below
/// the cases total is only a warning.
fn check_breakdowns(
    table: &RowTable,
    mapping: &CasesControlsMapping,
    breakdown_column: &str,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    for row in 0..table.height() {
        let raw = table.cell(row, breakdown_column).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let phenotype = table.cell(row, &mapping.phenotype).unwrap_or("");
        let cases = coerce_count(table.cell(row, &mapping.cases).unwrap_or(""));

        let mut sum = 0i64;
        for entry in raw.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut segments = entry.split(':');
            let (Some(code), Some(count_raw), None) =
                (segments.next(), segments.next(), segments.next())
            else {
                errors.push(format!(
                    "Malformed breakdown entry '{entry}' for phenotype '{phenotype}'"
                ));
                continue;
            };
            let code = code.trim();
            if code.is_empty() {
                errors.push(format!(
                    "Malformed breakdown entry '{entry}' for phenotype '{phenotype}'"
                ));
                continue;
            }

            let count = match parse_number(zero_suppressed(count_raw)) {
                Some(number) if number.fract() == 0.0 => number as i64,
                _ => {
                    errors.push(format!(
                        "Breakdown entry '{entry}' for phenotype '{phenotype}' has an invalid count"
                    ));
                    continue;
                }
            };
            if count < 0 {
                errors.push(format!(
                    "Breakdown entry '{entry}' for phenotype '{phenotype}' has a negative count"
                ));
                continue;
            }
            if count > cases {
                errors.push(format!(
                    "Breakdown code '{code}' count ({count}) exceeds cases ({cases}) for phenotype '{phenotype}'"
                ));
            }
            sum = sum.saturating_add(count);
        }

        if sum > 0 && sum < cases {
            warnings.push(format!(
                "Phenotype '{phenotype}': breakdown total ({sum}) is less than cases ({cases})"
            ));
        }
    }
}
