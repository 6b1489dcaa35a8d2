//! Validation core for the SGC intake pipeline.
//!
//! Two independent schema validators (cases/controls, co-occurrence), the
//! metadata extractors used for storage and for consistency checks, and the
//! cross-file consistency engine. Everything here is pure: collaborator
//! state (valid phenotype codes, stored metadata) is passed in by the
//! caller, so the logic is unit-testable without live infrastructure.

mod cases_controls;
mod checks;
mod cooccurrence;
mod cross_file;
mod extract;

pub use cases_controls::{FileValidation, validate_cases_controls};
pub use cooccurrence::validate_cooccurrence;
pub use cross_file::{
    check_cases_controls_consistency, check_cooccurrence_consistency,
    check_cross_family_consistency,
};
pub use extract::{
    extract_cases_controls_metadata, extract_cooccurrence_metadata,
    positional_cases_controls_mapping, positional_cooccurrence_mapping,
};
