#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CohortId, ColumnMapping, FileId, FileType};

/// Root of all SGC blob keys.
pub const STORAGE_ROOT: &str = "sgc";

/// A consortium-contributed dataset: owns its uploaded files and the overall
/// validation flag.
///
/// `validation_status` is reset to false whenever a file is added, replaced,
/// or deleted, and is only set true by a clean consistency run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    pub name: String,
    pub uploaded_by: String,
    /// Declared sizes, used as bounds during upload and consistency checks.
    pub total_sample_size: i64,
    pub number_of_males: i64,
    pub number_of_females: i64,
    pub validation_status: bool,
    pub created_at: DateTime<Utc>,
}

/// A file record to insert; the store assigns the id and upload timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCohortFile {
    pub cohort_id: CohortId,
    pub file_type: FileType,
    pub file_name: String,
    /// Blob key the raw bytes live under.
    pub file_path: String,
    pub file_size: u64,
    /// Mapping the uploader supplied; `None` for derived files, whose
    /// columns already use canonical names.
    pub column_mapping: Option<ColumnMapping>,
}

/// A stored file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortFile {
    pub id: FileId,
    pub cohort_id: CohortId,
    pub file_type: FileType,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub column_mapping: Option<ColumnMapping>,
    pub uploaded_at: DateTime<Utc>,
}

/// Blob key for an uploaded file: `sgc/{cohort_id}/{file_type}/{file_name}`.
pub fn upload_key(cohort_id: &CohortId, file_type: FileType, file_name: &str) -> String {
    format!("{STORAGE_ROOT}/{cohort_id}/{file_type}/{file_name}")
}

/// Deterministic blob key for a derived "both" file.
pub fn combined_key(cohort_id: &CohortId, file_type: FileType) -> String {
    format!("{STORAGE_ROOT}/{cohort_id}/{file_type}/{}", combined_file_name(file_type))
}

pub fn combined_file_name(file_type: FileType) -> String {
    format!("combined_{file_type}.tsv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileFamily, SexGroup};

    #[test]
    fn keys_follow_the_storage_layout() {
        let cohort_id = CohortId::new("c-7").unwrap();
        let ft = FileType::new(FileFamily::CasesControls, SexGroup::Male);
        assert_eq!(
            upload_key(&cohort_id, ft, "males.csv"),
            "sgc/c-7/cases_controls_male/males.csv"
        );

        let both = FileType::new(FileFamily::CasesControls, SexGroup::Both);
        assert_eq!(
            combined_key(&cohort_id, both),
            "sgc/c-7/cases_controls_both/combined_cases_controls_both.tsv"
        );
    }
}
