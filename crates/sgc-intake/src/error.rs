use thiserror::Error;

use sgc_store::StoreError;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("cohort '{0}' not found")]
    CohortNotFound(String),
    #[error("'{0}' files are derived during validation and cannot be uploaded directly")]
    DerivedFileType(String),
    #[error("column mapping is for the '{mapping_family}' family but the file type is '{file_type}'")]
    MappingFamilyMismatch {
        mapping_family: String,
        file_type: String,
    },
    /// The file failed schema validation or an upload-time size gate.
    /// Nothing was persisted.
    #[error("{error}")]
    FileRejected {
        error: String,
        warning: Option<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
