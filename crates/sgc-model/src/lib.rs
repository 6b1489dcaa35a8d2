//! Data model for the SGC cohort intake pipeline.
//!
//! Defines the identifiers, file-type tags, uploader column mappings, derived
//! metadata aggregates, and cohort/file records shared by the ingest,
//! validation, combination, and orchestration crates.

pub mod cohort;
pub mod error;
pub mod file_type;
pub mod ids;
pub mod mapping;
pub mod metadata;

pub use cohort::{
    Cohort, CohortFile, NewCohortFile, STORAGE_ROOT, combined_file_name, combined_key, upload_key,
};
pub use error::{ModelError, Result};
pub use file_type::{FileFamily, FileType, SexGroup};
pub use ids::{CohortId, FileId};
pub use mapping::{CasesControlsMapping, CoOccurrenceMapping, ColumnMapping, roles};
pub use metadata::{
    CasesControlsMetadata, CoOccurrenceMetadata, PhenotypeCounts, pair_key, split_pair_key,
};
