//! Storage collaborator contracts for the SGC intake core.
//!
//! The orchestrator and combiner talk to three collaborators through these
//! traits: a relational record store (cohorts, files, derived metadata, the
//! validation flag), an object store for raw bytes, and the phenotype-code
//! registry. Handles are constructed explicitly and passed in, never cached
//! at module scope, so the core logic runs against the in-memory
//! implementations in tests.

pub mod error;
pub mod memory;

use std::collections::BTreeSet;

use sgc_model::{
    CasesControlsMetadata, CoOccurrenceMetadata, Cohort, CohortFile, CohortId, FileId, FileType,
    NewCohortFile,
};

pub use error::{Result, StoreError};
pub use memory::{MemoryBlobStore, MemoryStore, StaticPhenotypeRegistry};

/// Record CRUD for cohorts, their files, and derived metadata.
///
/// Implementations enforce the per-cohort file-type uniqueness constraint:
/// inserting a second file with the same (family, sex) tag fails with
/// [`StoreError::DuplicateFileType`].
pub trait CohortStore {
    fn upsert_cohort(&self, cohort: Cohort) -> Result<()>;
    fn get_cohort(&self, cohort_id: &CohortId) -> Result<Option<Cohort>>;
    fn set_validation_status(&self, cohort_id: &CohortId, validated: bool) -> Result<()>;

    /// Insert a file record, assigning its id and upload timestamp.
    fn insert_file(&self, file: NewCohortFile) -> Result<CohortFile>;
    fn get_file(&self, file_id: &FileId) -> Result<Option<CohortFile>>;
    fn files_for_cohort(&self, cohort_id: &CohortId) -> Result<Vec<CohortFile>>;
    /// Remove a file record. Returns false when it did not exist.
    fn delete_file(&self, file_id: &FileId) -> Result<bool>;

    fn insert_cases_controls_metadata(
        &self,
        file_id: &FileId,
        metadata: CasesControlsMetadata,
    ) -> Result<()>;
    fn get_cases_controls_metadata(&self, file_id: &FileId)
    -> Result<Option<CasesControlsMetadata>>;
    fn delete_cases_controls_metadata(&self, file_id: &FileId) -> Result<()>;

    fn insert_cooccurrence_metadata(
        &self,
        file_id: &FileId,
        metadata: CoOccurrenceMetadata,
    ) -> Result<()>;
    fn get_cooccurrence_metadata(&self, file_id: &FileId) -> Result<Option<CoOccurrenceMetadata>>;
    fn delete_cooccurrence_metadata(&self, file_id: &FileId) -> Result<()>;
}

/// Byte storage addressed by slash-delimited keys.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>>;
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Lookup of the currently valid phenotype codes.
///
/// The set is small enough to hold in memory for one validation run;
/// callers fetch it once per run and pass it into the validators.
pub trait PhenotypeRegistry {
    fn valid_codes(&self) -> Result<BTreeSet<String>>;
}

/// Convenience: the cohort's file record for a given type, if any.
pub fn find_file(
    store: &dyn CohortStore,
    cohort_id: &CohortId,
    file_type: FileType,
) -> Result<Option<CohortFile>> {
    Ok(store
        .files_for_cohort(cohort_id)?
        .into_iter()
        .find(|file| file.file_type == file_type))
}
