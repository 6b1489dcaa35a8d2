//! Parsing and normalization for SGC uploads.
//!
//! Turns raw upload bytes into an owned [`RowTable`] (delimiter chosen from
//! the file extension) and provides the suppressed-value normalizer that
//! rewrites privacy-redacted counts (`<5`) to zero before validation and
//! aggregation.

pub mod normalize;
pub mod reader;
pub mod table;

pub use normalize::{
    coerce_count, is_suppressed_count, parse_number, zero_suppressed, zero_suppressed_column,
};
pub use reader::{delimiter_for_filename, read_named_table, read_table};
pub use table::RowTable;
