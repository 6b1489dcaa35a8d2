#![deny(unsafe_code)]

use crate::table::RowTable;

/// True when a cell carries a privacy-suppressed small count such as `<5`
/// or `< 10`.
pub fn is_suppressed_count(raw: &str) -> bool {
    raw.trim().starts_with('<')
}

/// Map a suppressed count to `"0"`; every other value (including the empty
/// cell) passes through unchanged. Pure; callers decide whether to write
/// the result back.
pub fn zero_suppressed(raw: &str) -> &str {
    if is_suppressed_count(raw) { "0" } else { raw }
}

/// Rewrite one column in place, replacing suppressed counts with zero.
///
/// Must run before any sign/type/integrality check and before aggregation.
/// Returns false when the column does not exist.
pub fn zero_suppressed_column(table: &mut RowTable, column: &str) -> bool {
    let Some(idx) = table.column_index(column) else {
        return false;
    };
    let mut rewritten = 0usize;
    for row in &mut table.rows {
        if is_suppressed_count(&row[idx]) {
            row[idx] = "0".to_string();
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        tracing::debug!(column, rewritten, "zeroed suppressed counts");
    }
    true
}

/// Parse a numeric cell. `None` for empty or non-numeric values.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Coerce a cell to an integer count: suppressed values and anything
/// unparseable become 0.
pub fn coerce_count(raw: &str) -> i64 {
    parse_number(zero_suppressed(raw)).map_or(0, |v| v as i64)
}
