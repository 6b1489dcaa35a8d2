//! In-memory collaborator implementations.
//!
//! Mirror the relational/object-store semantics closely enough for the
//! orchestrator's end-to-end tests: store-assigned file ids, the file-type
//! uniqueness constraint, cascade-style metadata deletion by file id, and
//! last-writer-wins blob overwrites.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::Utc;
use sgc_model::{
    CasesControlsMetadata, CoOccurrenceMetadata, Cohort, CohortFile, CohortId, FileId,
    NewCohortFile,
};

use crate::{BlobStore, CohortStore, PhenotypeRegistry, Result, StoreError};

#[derive(Debug, Default)]
struct Records {
    cohorts: BTreeMap<CohortId, Cohort>,
    files: BTreeMap<FileId, CohortFile>,
    cases_controls_metadata: BTreeMap<FileId, CasesControlsMetadata>,
    cooccurrence_metadata: BTreeMap<FileId, CoOccurrenceMetadata>,
    next_file_id: u64,
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        // A poisoned lock means a prior test panicked mid-write; the data is
        // still usable for reads in follow-up assertions.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CohortStore for MemoryStore {
    fn upsert_cohort(&self, cohort: Cohort) -> Result<()> {
        self.lock().cohorts.insert(cohort.id.clone(), cohort);
        Ok(())
    }

    fn get_cohort(&self, cohort_id: &CohortId) -> Result<Option<Cohort>> {
        Ok(self.lock().cohorts.get(cohort_id).cloned())
    }

    fn set_validation_status(&self, cohort_id: &CohortId, validated: bool) -> Result<()> {
        let mut records = self.lock();
        let cohort = records
            .cohorts
            .get_mut(cohort_id)
            .ok_or_else(|| StoreError::CohortNotFound(cohort_id.to_string()))?;
        cohort.validation_status = validated;
        Ok(())
    }

    fn insert_file(&self, file: NewCohortFile) -> Result<CohortFile> {
        let mut records = self.lock();
        if !records.cohorts.contains_key(&file.cohort_id) {
            return Err(StoreError::CohortNotFound(file.cohort_id.to_string()));
        }
        let duplicate = records
            .files
            .values()
            .any(|existing| existing.cohort_id == file.cohort_id && existing.file_type == file.file_type);
        if duplicate {
            return Err(StoreError::DuplicateFileType {
                cohort_id: file.cohort_id.to_string(),
                file_type: file.file_type.to_string(),
            });
        }

        records.next_file_id += 1;
        let id = FileId::new(format!("file-{}", records.next_file_id))
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let stored = CohortFile {
            id: id.clone(),
            cohort_id: file.cohort_id,
            file_type: file.file_type,
            file_name: file.file_name,
            file_path: file.file_path,
            file_size: file.file_size,
            column_mapping: file.column_mapping,
            uploaded_at: Utc::now(),
        };
        records.files.insert(id, stored.clone());
        Ok(stored)
    }

    fn get_file(&self, file_id: &FileId) -> Result<Option<CohortFile>> {
        Ok(self.lock().files.get(file_id).cloned())
    }

    fn files_for_cohort(&self, cohort_id: &CohortId) -> Result<Vec<CohortFile>> {
        Ok(self
            .lock()
            .files
            .values()
            .filter(|file| &file.cohort_id == cohort_id)
            .cloned()
            .collect())
    }

    fn delete_file(&self, file_id: &FileId) -> Result<bool> {
        Ok(self.lock().files.remove(file_id).is_some())
    }

    fn insert_cases_controls_metadata(
        &self,
        file_id: &FileId,
        metadata: CasesControlsMetadata,
    ) -> Result<()> {
        self.lock()
            .cases_controls_metadata
            .insert(file_id.clone(), metadata);
        Ok(())
    }

    fn get_cases_controls_metadata(
        &self,
        file_id: &FileId,
    ) -> Result<Option<CasesControlsMetadata>> {
        Ok(self.lock().cases_controls_metadata.get(file_id).cloned())
    }

    fn delete_cases_controls_metadata(&self, file_id: &FileId) -> Result<()> {
        self.lock().cases_controls_metadata.remove(file_id);
        Ok(())
    }

    fn insert_cooccurrence_metadata(
        &self,
        file_id: &FileId,
        metadata: CoOccurrenceMetadata,
    ) -> Result<()> {
        self.lock()
            .cooccurrence_metadata
            .insert(file_id.clone(), metadata);
        Ok(())
    }

    fn get_cooccurrence_metadata(&self, file_id: &FileId) -> Result<Option<CoOccurrenceMetadata>> {
        Ok(self.lock().cooccurrence_metadata.get(file_id).cloned())
    }

    fn delete_cooccurrence_metadata(&self, file_id: &FileId) -> Result<()> {
        self.lock().cooccurrence_metadata.remove(file_id);
        Ok(())
    }
}

/// In-memory blob store. Overwrites are last-writer-wins, like the real
/// object store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }
}

/// Fixed phenotype-code registry.
#[derive(Debug, Default)]
pub struct StaticPhenotypeRegistry {
    codes: BTreeSet<String>,
}

impl StaticPhenotypeRegistry {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }
}

impl PhenotypeRegistry for StaticPhenotypeRegistry {
    fn valid_codes(&self) -> Result<BTreeSet<String>> {
        Ok(self.codes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgc_model::{FileFamily, FileType, SexGroup};

    fn cohort(id: &str) -> Cohort {
        Cohort {
            id: CohortId::new(id).unwrap(),
            name: format!("cohort {id}"),
            uploaded_by: "uploader".to_string(),
            total_sample_size: 0,
            number_of_males: 0,
            number_of_females: 0,
            validation_status: false,
            created_at: Utc::now(),
        }
    }

    fn new_file(cohort_id: &CohortId, file_type: FileType) -> NewCohortFile {
        NewCohortFile {
            cohort_id: cohort_id.clone(),
            file_type,
            file_name: "f.csv".to_string(),
            file_path: format!("sgc/{cohort_id}/{file_type}/f.csv"),
            file_size: 1,
            column_mapping: None,
        }
    }

    #[test]
    fn duplicate_file_type_is_rejected_until_the_first_is_deleted() {
        let store = MemoryStore::new();
        let cohort = cohort("c-1");
        let id = cohort.id.clone();
        store.upsert_cohort(cohort).unwrap();

        let file_type = FileType::new(FileFamily::CasesControls, SexGroup::Male);
        let first = store.insert_file(new_file(&id, file_type)).unwrap();
        let second = store.insert_file(new_file(&id, file_type));
        assert!(matches!(
            second,
            Err(StoreError::DuplicateFileType { .. })
        ));

        assert!(store.delete_file(&first.id).unwrap());
        store.insert_file(new_file(&id, file_type)).unwrap();
    }

    #[test]
    fn file_ids_are_store_assigned_and_unique() {
        let store = MemoryStore::new();
        let cohort = cohort("c-1");
        let id = cohort.id.clone();
        store.upsert_cohort(cohort).unwrap();

        let male = store
            .insert_file(new_file(&id, FileType::new(FileFamily::CasesControls, SexGroup::Male)))
            .unwrap();
        let female = store
            .insert_file(new_file(&id, FileType::new(FileFamily::CasesControls, SexGroup::Female)))
            .unwrap();
        assert_ne!(male.id, female.id);
        assert_eq!(store.files_for_cohort(&id).unwrap().len(), 2);
    }

    #[test]
    fn metadata_is_keyed_by_file_id() {
        let store = MemoryStore::new();
        let cohort = cohort("c-1");
        let id = cohort.id.clone();
        store.upsert_cohort(cohort).unwrap();
        let file = store
            .insert_file(new_file(&id, FileType::new(FileFamily::CasesControls, SexGroup::Male)))
            .unwrap();

        store
            .insert_cases_controls_metadata(&file.id, CasesControlsMetadata::default())
            .unwrap();
        assert!(store.get_cases_controls_metadata(&file.id).unwrap().is_some());

        store.delete_cases_controls_metadata(&file.id).unwrap();
        assert!(store.get_cases_controls_metadata(&file.id).unwrap().is_none());
    }

    #[test]
    fn blob_store_overwrites_and_deletes() {
        let blobs = MemoryBlobStore::new();
        blobs.put("sgc/c/k", b"one", "text/tab-separated-values").unwrap();
        blobs.put("sgc/c/k", b"two", "text/tab-separated-values").unwrap();
        assert_eq!(blobs.get("sgc/c/k").unwrap(), b"two");

        blobs.delete("sgc/c/k").unwrap();
        assert!(matches!(blobs.get("sgc/c/k"), Err(StoreError::BlobNotFound(_))));
    }
}
