#![deny(unsafe_code)]

use anyhow::{Context, Result, bail};

/// An owned tabular row set: a header row plus string cells.
///
/// Cells are stored trimmed; the empty string represents a missing value.
/// Column lookup is exact, matching the uploader-supplied column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell values of one column, top to bottom. Empty iterator when the
    /// column does not exist.
    pub fn column_values<'a>(&'a self, name: &str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self.column_index(name) {
            Some(idx) => Box::new(self.rows.iter().map(move |row| row[idx].as_str())),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Rename a column header in place. Returns false when absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            bail!(
                "row has {} cells but the table has {} columns",
                row.len(),
                self.headers.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Serialize with the given delimiter. Combined output always uses a tab.
    pub fn to_delimited_bytes(&self, delimiter: u8) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .context("writing header row")?;
        for row in &self.rows {
            writer.write_record(row).context("writing data row")?;
        }
        writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("flushing serialized table: {err}"))
    }
}
