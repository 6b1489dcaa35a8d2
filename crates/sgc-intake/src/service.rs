//! The upload and validate-all orchestrator.
//!
//! Sequences the ingest, validation, storage, and combination components per
//! request: an upload is validated and gated before any byte is stored, and
//! the validate-all run regenerates the derived "both" files before the
//! consistency checks see them. Concurrent calls for the same cohort are not
//! mutually excluded here; blob writes are last-writer-wins and the final
//! validation-status write reflects whichever run finishes last. Callers
//! that need race-freedom must serialize per cohort.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;

use sgc_combine::regenerate_both_file;
use sgc_ingest::{delimiter_for_filename, read_named_table};
use sgc_model::{
    CasesControlsMetadata, CoOccurrenceMetadata, Cohort, CohortFile, CohortId, ColumnMapping,
    FileFamily, FileId, FileType, NewCohortFile, SexGroup, upload_key,
};
use sgc_store::{BlobStore, CohortStore, PhenotypeRegistry, StoreError};
use sgc_validate::{
    check_cases_controls_consistency, check_cooccurrence_consistency,
    check_cross_family_consistency, extract_cases_controls_metadata,
    extract_cooccurrence_metadata, validate_cases_controls, validate_cooccurrence,
};

use crate::error::{IntakeError, Result};

/// Outcome of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub storage_key: String,
    pub file_size: u64,
    /// Non-blocking validator warning, surfaced to the uploader.
    pub warning: Option<String>,
}

/// Outcome of a validate-all run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRun {
    pub validated: bool,
    /// The first failing check's message; later checks did not run.
    pub failure: Option<String>,
}

/// Orchestrates cohort file intake over injected collaborator handles.
pub struct CohortService<'a> {
    store: &'a dyn CohortStore,
    blobs: &'a dyn BlobStore,
    registry: &'a dyn PhenotypeRegistry,
}

impl<'a> CohortService<'a> {
    pub fn new(
        store: &'a dyn CohortStore,
        blobs: &'a dyn BlobStore,
        registry: &'a dyn PhenotypeRegistry,
    ) -> Self {
        Self {
            store,
            blobs,
            registry,
        }
    }

    /// Create or update a cohort record.
    ///
    /// The stored validation status is always false afterwards: new cohorts
    /// start unvalidated, and an update may have changed the declared sample
    /// sizes the consistency checks compare against.
    pub fn upsert_cohort(&self, mut cohort: Cohort) -> Result<()> {
        cohort.validation_status = false;
        tracing::debug!(cohort_id = %cohort.id, "upserting cohort");
        self.store.upsert_cohort(cohort)?;
        Ok(())
    }

    /// Validate and store one uploaded file.
    ///
    /// Runs the schema validator and the declared-size gates before any byte
    /// or record is persisted; a rejection leaves no trace. An accepted
    /// upload stores the raw bytes, inserts the file record and its
    /// extracted metadata, and resets the cohort's validation status.
    pub fn upload_file(
        &self,
        cohort_id: &CohortId,
        file_type: FileType,
        file_name: &str,
        bytes: &[u8],
        mapping: ColumnMapping,
    ) -> Result<UploadReceipt> {
        if file_type.is_derived() {
            return Err(IntakeError::DerivedFileType(file_type.to_string()));
        }
        if mapping.family() != file_type.family {
            return Err(IntakeError::MappingFamilyMismatch {
                mapping_family: mapping.family().to_string(),
                file_type: file_type.to_string(),
            });
        }
        let cohort = self
            .store
            .get_cohort(cohort_id)?
            .ok_or_else(|| IntakeError::CohortNotFound(cohort_id.to_string()))?;

        let mut table = read_named_table(bytes, file_name)?;
        let valid_codes = self.registry.valid_codes()?;

        // Validation normalizes the numeric columns in place, so the
        // extraction below sees suppressed values as zeros.
        let (metadata, warning) = match &mapping {
            ColumnMapping::CasesControls(mapping) => {
                let outcome = validate_cases_controls(&mut table, mapping, &valid_codes);
                if let Some(error) = outcome.error {
                    return Err(IntakeError::FileRejected {
                        error,
                        warning: outcome.warning,
                    });
                }
                let metadata = extract_cases_controls_metadata(&table, mapping);
                if let Some(error) = cases_controls_size_gate(&cohort, file_type.sex, &metadata) {
                    return Err(IntakeError::FileRejected {
                        error,
                        warning: outcome.warning,
                    });
                }
                (FamilyMetadata::CasesControls(metadata), outcome.warning)
            }
            ColumnMapping::Cooccurrence(mapping) => {
                if let Some(error) = validate_cooccurrence(&mut table, mapping, &valid_codes) {
                    return Err(IntakeError::FileRejected {
                        error,
                        warning: None,
                    });
                }
                let metadata = extract_cooccurrence_metadata(&table, mapping);
                if let Some(error) = cooccurrence_size_gate(&cohort, file_type.sex, &metadata) {
                    return Err(IntakeError::FileRejected {
                        error,
                        warning: None,
                    });
                }
                (FamilyMetadata::Cooccurrence(metadata), None)
            }
        };

        // Record first: the type-uniqueness constraint runs before any byte
        // is written, so a duplicate cannot overwrite the live file's blob.
        let key = upload_key(cohort_id, file_type, file_name);
        let file = self.store.insert_file(NewCohortFile {
            cohort_id: cohort_id.clone(),
            file_type,
            file_name: file_name.to_string(),
            file_path: key.clone(),
            file_size: bytes.len() as u64,
            column_mapping: Some(mapping),
        })?;

        if let Err(err) = self
            .blobs
            .put(&key, bytes, content_type_for(file_name))
            .with_context(|| format!("storing '{key}'"))
        {
            // Roll the record back; a failed write leaves no trace either.
            self.store.delete_file(&file.id)?;
            return Err(IntakeError::Other(err));
        }

        self.store.set_validation_status(cohort_id, false)?;

        match metadata {
            FamilyMetadata::CasesControls(metadata) => {
                self.store.insert_cases_controls_metadata(&file.id, metadata)?;
            }
            FamilyMetadata::Cooccurrence(metadata) => {
                self.store.insert_cooccurrence_metadata(&file.id, metadata)?;
            }
        }

        tracing::info!(
            %cohort_id,
            file_type = %file_type,
            file_name,
            bytes = file.file_size,
            "stored cohort file"
        );
        Ok(UploadReceipt {
            file_id: file.id,
            storage_key: key,
            file_size: bytes.len() as u64,
            warning,
        })
    }

    /// Delete a file record and its derived metadata, resetting the
    /// cohort's validation status. Returns the deleted record.
    pub fn delete_file(&self, file_id: &FileId) -> Result<CohortFile> {
        let file = self
            .store
            .get_file(file_id)?
            .ok_or_else(|| StoreError::FileNotFound(file_id.to_string()))?;

        // Only one metadata kind exists per file; deleting both is harmless.
        self.store.delete_cases_controls_metadata(file_id)?;
        self.store.delete_cooccurrence_metadata(file_id)?;
        self.store.delete_file(file_id)?;
        self.store.set_validation_status(&file.cohort_id, false)?;

        tracing::info!(
            cohort_id = %file.cohort_id,
            file_type = %file.file_type,
            "deleted cohort file"
        );
        Ok(file)
    }

    /// Run the full consistency sequence for a cohort.
    ///
    /// Regenerates the derived "both" file of each family where both sex
    /// inputs exist, then runs the three consistency checks fail-fast. Only
    /// a fully clean run flips the cohort's validation status to true; a
    /// failed run returns the first failing check's message and leaves the
    /// status untouched.
    pub fn validate_cohort(&self, cohort_id: &CohortId) -> Result<ValidationRun> {
        let cohort = self
            .store
            .get_cohort(cohort_id)?
            .ok_or_else(|| IntakeError::CohortNotFound(cohort_id.to_string()))?;

        for family in [FileFamily::CasesControls, FileFamily::CoOccurrence] {
            regenerate_both_file(self.store, self.blobs, cohort_id, family)?;
        }

        let files = self.store.files_for_cohort(cohort_id)?;
        let present: BTreeSet<FileType> = files.iter().map(|file| file.file_type).collect();

        let mut cases_controls: BTreeMap<SexGroup, CasesControlsMetadata> = BTreeMap::new();
        let mut cooccurrence: BTreeMap<SexGroup, CoOccurrenceMetadata> = BTreeMap::new();
        for file in &files {
            match file.file_type.family {
                FileFamily::CasesControls => {
                    if let Some(metadata) = self.store.get_cases_controls_metadata(&file.id)? {
                        cases_controls.insert(file.file_type.sex, metadata);
                    }
                }
                FileFamily::CoOccurrence => {
                    if let Some(metadata) = self.store.get_cooccurrence_metadata(&file.id)? {
                        cooccurrence.insert(file.file_type.sex, metadata);
                    }
                }
            }
        }

        let failure = check_cases_controls_consistency(&cohort, &present, &cases_controls)
            .or_else(|| check_cooccurrence_consistency(&cohort, &present, &cooccurrence))
            .or_else(|| check_cross_family_consistency(&cases_controls, &cooccurrence));

        if let Some(message) = failure {
            tracing::info!(%cohort_id, %message, "cohort failed consistency validation");
            return Ok(ValidationRun {
                validated: false,
                failure: Some(message),
            });
        }

        self.store.set_validation_status(cohort_id, true)?;
        tracing::info!(%cohort_id, "cohort passed all consistency checks");
        Ok(ValidationRun {
            validated: true,
            failure: None,
        })
    }
}

enum FamilyMetadata {
    CasesControls(CasesControlsMetadata),
    Cooccurrence(CoOccurrenceMetadata),
}

/// A sex-specific cases/controls file must account for exactly the declared
/// number of participants of that sex.
fn cases_controls_size_gate(
    cohort: &Cohort,
    sex: SexGroup,
    metadata: &CasesControlsMetadata,
) -> Option<String> {
    let file_total = metadata.grand_total();
    match sex {
        SexGroup::Male if file_total != cohort.number_of_males => Some(format!(
            "Male cases/controls file total ({file_total}) does not match cohort male count ({})",
            cohort.number_of_males
        )),
        SexGroup::Female if file_total != cohort.number_of_females => Some(format!(
            "Female cases/controls file total ({file_total}) does not match cohort female count ({})",
            cohort.number_of_females
        )),
        _ => None,
    }
}

/// No co-occurrence count may exceed the declared size for its sex axis.
fn cooccurrence_size_gate(
    cohort: &Cohort,
    sex: SexGroup,
    metadata: &CoOccurrenceMetadata,
) -> Option<String> {
    let max = metadata.max_pair_count();
    match sex {
        SexGroup::Male if max > cohort.number_of_males => Some(format!(
            "Male co-occurrence file contains counts ({max}) exceeding cohort male count ({})",
            cohort.number_of_males
        )),
        SexGroup::Female if max > cohort.number_of_females => Some(format!(
            "Female co-occurrence file contains counts ({max}) exceeding cohort female count ({})",
            cohort.number_of_females
        )),
        _ => None,
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    match delimiter_for_filename(file_name) {
        b'\t' => "text/tab-separated-values",
        _ => "text/csv",
    }
}
