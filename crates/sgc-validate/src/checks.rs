//! Shared building blocks for the schema validators: sample-limited message
//! formatting, duplicate detection, and the numeric column check chain.

use std::collections::HashMap;

use sgc_ingest::{RowTable, parse_number};

/// How many offending values a single error message names before switching
/// to an overflow count.
pub(crate) const SAMPLE_LIMIT: usize = 5;

/// Join up to [`SAMPLE_LIMIT`] items, appending `(and N more)` past that.
pub(crate) fn sample_list<S: AsRef<str>>(items: &[S]) -> String {
    let shown: Vec<&str> = items.iter().take(SAMPLE_LIMIT).map(AsRef::as_ref).collect();
    let mut out = shown.join(", ");
    if items.len() > SAMPLE_LIMIT {
        out.push_str(&format!(" (and {} more)", items.len() - SAMPLE_LIMIT));
    }
    out
}

/// Values appearing more than once, in first-seen order.
pub(crate) fn duplicate_values<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for value in values {
        let entry = counts.entry(value.clone()).or_insert(0);
        *entry += 1;
        if *entry == 1 {
            order.push(value);
        }
    }
    order.retain(|value| counts[value] > 1);
    order
}

/// Validate a count column after suppressed-value normalization.
///
/// Checks empty, non-numeric, negative, and non-integer in that priority
/// order; only the first applicable failure is reported so one malformed
/// column produces one message.
pub(crate) fn check_count_column(table: &RowTable, column: &str) -> Option<String> {
    let values: Vec<&str> = table.column_values(column).collect();
    if values.iter().any(|value| value.is_empty()) {
        return Some(format!("Column '{column}' contains empty values"));
    }

    let mut parsed = Vec::with_capacity(values.len());
    for value in &values {
        match parse_number(value) {
            Some(number) => parsed.push(number),
            None => return Some(format!("Column '{column}' contains non-numeric values")),
        }
    }
    if parsed.iter().any(|number| *number < 0.0) {
        return Some(format!("Column '{column}' must not contain negative values"));
    }
    if parsed.iter().any(|number| number.fract() != 0.0) {
        return Some(format!(
            "Column '{column}' must contain integers, not decimals"
        ));
    }
    None
}

/// `None` when no messages accumulated, otherwise semicolon-joined.
pub(crate) fn join_messages(messages: Vec<String>) -> Option<String> {
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_table(values: &[&str]) -> RowTable {
        let mut table = RowTable::new(vec!["n".to_string()]);
        for value in values {
            table.push_row(vec![value.to_string()]).unwrap();
        }
        table
    }

    #[test]
    fn sample_list_caps_at_five() {
        let items: Vec<String> = (1..=7).map(|i| format!("P{i}")).collect();
        assert_eq!(sample_list(&items), "P1, P2, P3, P4, P5 (and 2 more)");
        assert_eq!(sample_list(&items[..2]), "P1, P2");
    }

    #[test]
    fn duplicate_values_preserve_first_seen_order() {
        let dups = duplicate_values(
            ["B", "A", "B", "C", "A", "B"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(dups, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn count_chain_reports_first_failure_only() {
        assert_eq!(
            check_count_column(&count_table(&["1", ""]), "n"),
            Some("Column 'n' contains empty values".to_string())
        );
        assert_eq!(
            check_count_column(&count_table(&["1", "x"]), "n"),
            Some("Column 'n' contains non-numeric values".to_string())
        );
        assert_eq!(
            check_count_column(&count_table(&["1", "-2"]), "n"),
            Some("Column 'n' must not contain negative values".to_string())
        );
        assert_eq!(
            check_count_column(&count_table(&["1", "2.5"]), "n"),
            Some("Column 'n' must contain integers, not decimals".to_string())
        );
        assert_eq!(check_count_column(&count_table(&["0", "12"]), "n"), None);
    }
}
