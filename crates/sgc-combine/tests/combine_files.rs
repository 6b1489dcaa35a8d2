use chrono::Utc;
use sgc_combine::regenerate_both_file;
use sgc_model::{
    CasesControlsMapping, Cohort, CohortId, ColumnMapping, FileFamily, FileType, NewCohortFile,
    SexGroup, combined_key, upload_key,
};
use sgc_store::{BlobStore, CohortStore, MemoryBlobStore, MemoryStore, StoreError, find_file};

fn cohort(id: &str) -> Cohort {
    Cohort {
        id: CohortId::new(id).unwrap(),
        name: format!("cohort {id}"),
        uploaded_by: "uploader".to_string(),
        total_sample_size: 1000,
        number_of_males: 500,
        number_of_females: 500,
        validation_status: false,
        created_at: Utc::now(),
    }
}

fn seed_file(
    store: &MemoryStore,
    blobs: &MemoryBlobStore,
    cohort_id: &CohortId,
    file_type: FileType,
    file_name: &str,
    body: &str,
    mapping: Option<ColumnMapping>,
) {
    let key = upload_key(cohort_id, file_type, file_name);
    blobs.put(&key, body.as_bytes(), "text/csv").unwrap();
    store
        .insert_file(NewCohortFile {
            cohort_id: cohort_id.clone(),
            file_type,
            file_name: file_name.to_string(),
            file_path: key,
            file_size: body.len() as u64,
            column_mapping: mapping,
        })
        .unwrap();
}

#[test]
fn combined_file_sums_counts_and_lands_at_the_deterministic_key() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let cohort = cohort("c-1");
    let id = cohort.id.clone();
    store.upsert_cohort(cohort).unwrap();

    let mapping = ColumnMapping::CasesControls(CasesControlsMapping {
        phenotype: "PHENO".to_string(),
        cases: "N_CASES".to_string(),
        controls: "N_CONTROLS".to_string(),
        breakdown: None,
    });
    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Male),
        "males.csv",
        "PHENO,N_CASES,N_CONTROLS\nP1,10,20\n",
        Some(mapping.clone()),
    );
    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Female),
        "females.tsv",
        "PHENO\tN_CASES\tN_CONTROLS\nP1\t5\t15\n",
        Some(mapping),
    );

    let file = regenerate_both_file(&store, &blobs, &id, FileFamily::CasesControls)
        .unwrap()
        .expect("both inputs present");

    let both_type = FileType::new(FileFamily::CasesControls, SexGroup::Both);
    assert_eq!(file.file_type, both_type);
    assert_eq!(file.file_name, "combined_cases_controls_both.tsv");
    assert!(file.column_mapping.is_none());

    let bytes = blobs.get(&combined_key(&id, both_type)).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text, "phenotype\tcases\tcontrols\nP1\t15\t35\n");

    let metadata = store
        .get_cases_controls_metadata(&file.id)
        .unwrap()
        .expect("metadata extracted for the combined file");
    assert_eq!(metadata.total_cases, 15);
    assert_eq!(metadata.total_controls, 35);
    assert_eq!(metadata.distinct_phenotypes, vec!["P1".to_string()]);
}

#[test]
fn suppressed_counts_become_zero_before_summing() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let cohort = cohort("c-2");
    let id = cohort.id.clone();
    store.upsert_cohort(cohort).unwrap();

    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Male),
        "males.csv",
        "phenotype,cases,controls\nP1,<5,10\n",
        None,
    );
    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Female),
        "females.csv",
        "phenotype,cases,controls\nP1,7,<5\n",
        None,
    );

    let file = regenerate_both_file(&store, &blobs, &id, FileFamily::CasesControls)
        .unwrap()
        .unwrap();
    let text = String::from_utf8(blobs.get(&file.file_path).unwrap()).unwrap();
    assert_eq!(text, "phenotype\tcases\tcontrols\nP1\t7\t10\n");
}

#[test]
fn regeneration_replaces_the_previous_combined_file() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let cohort = cohort("c-3");
    let id = cohort.id.clone();
    store.upsert_cohort(cohort).unwrap();

    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CoOccurrence, SexGroup::Male),
        "males.csv",
        "phenotype1,phenotype2,cooccurrence_count\nP1,P2,3\n",
        None,
    );
    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CoOccurrence, SexGroup::Female),
        "females.csv",
        "phenotype1,phenotype2,cooccurrence_count\nP2,P1,2\n",
        None,
    );

    let first = regenerate_both_file(&store, &blobs, &id, FileFamily::CoOccurrence)
        .unwrap()
        .unwrap();
    let second = regenerate_both_file(&store, &blobs, &id, FileFamily::CoOccurrence)
        .unwrap()
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(store.get_file(&first.id).unwrap().is_none());
    assert!(store.get_cooccurrence_metadata(&first.id).unwrap().is_none());

    let both_type = FileType::new(FileFamily::CoOccurrence, SexGroup::Both);
    let stored = find_file(&store, &id, both_type).unwrap().unwrap();
    assert_eq!(stored.id, second.id);

    let text = String::from_utf8(blobs.get(&stored.file_path).unwrap()).unwrap();
    assert_eq!(
        text,
        "phenotype1\tphenotype2\tcooccurrence_count\nP1\tP2\t5\n"
    );
    let metadata = store
        .get_cooccurrence_metadata(&second.id)
        .unwrap()
        .unwrap();
    assert_eq!(metadata.total_pairs, 1);
    assert_eq!(metadata.total_cooccurrence_count, 5);
}

/// Reads and deletes pass through; every write fails.
struct ReadOnlyBlobs<'a> {
    inner: &'a MemoryBlobStore,
}

impl BlobStore for ReadOnlyBlobs<'_> {
    fn get(&self, key: &str) -> sgc_store::Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn put(&self, _key: &str, _bytes: &[u8], _content_type: &str) -> sgc_store::Result<()> {
        Err(StoreError::Backend("write refused".to_string()))
    }

    fn delete(&self, key: &str) -> sgc_store::Result<()> {
        self.inner.delete(key)
    }
}

#[test]
fn failed_combined_write_keeps_the_previous_file() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let cohort = cohort("c-5");
    let id = cohort.id.clone();
    store.upsert_cohort(cohort).unwrap();

    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Male),
        "males.csv",
        "phenotype,cases,controls\nP1,10,20\n",
        None,
    );
    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Female),
        "females.csv",
        "phenotype,cases,controls\nP1,5,15\n",
        None,
    );

    let first = regenerate_both_file(&store, &blobs, &id, FileFamily::CasesControls)
        .unwrap()
        .unwrap();
    let original = blobs.get(&first.file_path).unwrap();

    let failing = ReadOnlyBlobs { inner: &blobs };
    let result = regenerate_both_file(&store, &failing, &id, FileFamily::CasesControls);
    assert!(result.is_err());

    // The earlier combined file, its metadata, and its bytes all survive.
    assert!(store.get_file(&first.id).unwrap().is_some());
    assert!(store.get_cases_controls_metadata(&first.id).unwrap().is_some());
    assert_eq!(blobs.get(&first.file_path).unwrap(), original);
}

#[test]
fn missing_counterpart_skips_combination() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let cohort = cohort("c-4");
    let id = cohort.id.clone();
    store.upsert_cohort(cohort).unwrap();

    seed_file(
        &store,
        &blobs,
        &id,
        FileType::new(FileFamily::CasesControls, SexGroup::Male),
        "males.csv",
        "phenotype,cases,controls\nP1,1,2\n",
        None,
    );

    let result = regenerate_both_file(&store, &blobs, &id, FileFamily::CasesControls).unwrap();
    assert!(result.is_none());
    assert!(blobs.keys().iter().all(|key| !key.contains("both")));
}
