#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};

use crate::table::RowTable;

/// Field delimiter chosen from the file extension.
///
/// `.tsv` and `.txt` are tab-delimited; `.csv` and anything unrecognized
/// fall back to a comma.
pub fn delimiter_for_filename(file_name: &str) -> u8 {
    match Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

/// Parse raw bytes into a [`RowTable`] with the given delimiter.
///
/// Header and cell values are trimmed (including a leading BOM); column
/// order is preserved.
pub fn read_table(bytes: &[u8], delimiter: u8) -> Result<RowTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(normalize_cell)
        .collect();

    let mut table = RowTable::new(headers);
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading record {}", idx + 1))?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        table
            .push_row(row)
            .with_context(|| format!("record {} is ragged", idx + 1))?;
    }

    tracing::debug!(
        columns = table.headers.len(),
        rows = table.height(),
        "parsed delimited table"
    );
    Ok(table)
}

/// Parse a named upload, picking the delimiter from its extension.
pub fn read_named_table(bytes: &[u8], file_name: &str) -> Result<RowTable> {
    read_table(bytes, delimiter_for_filename(file_name))
        .with_context(|| format!("parsing '{file_name}'"))
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(delimiter_for_filename("males.tsv"), b'\t');
        assert_eq!(delimiter_for_filename("males.TXT"), b'\t');
        assert_eq!(delimiter_for_filename("males.csv"), b',');
        assert_eq!(delimiter_for_filename("males.dat"), b',');
        assert_eq!(delimiter_for_filename("males"), b',');
    }

    #[test]
    fn reads_comma_and_tab_tables() {
        let csv_table = read_named_table(b"phenotype,cases\nP1, 10\n", "f.csv").unwrap();
        assert_eq!(csv_table.cell(0, "cases"), Some("10"));

        let tsv_table = read_named_table(b"phenotype\tcases\nP1\t10\n", "f.tsv").unwrap();
        assert_eq!(tsv_table.cell(0, "phenotype"), Some("P1"));
    }

    #[test]
    fn ragged_input_is_an_error() {
        let result = read_named_table(b"a,b\n1\n", "f.csv");
        assert!(result.is_err());
    }

    #[test]
    fn bom_is_stripped_from_the_first_header() {
        let table = read_named_table("\u{feff}phenotype,cases\nP1,1\n".as_bytes(), "f.csv").unwrap();
        assert_eq!(table.headers[0], "phenotype");
    }
}
