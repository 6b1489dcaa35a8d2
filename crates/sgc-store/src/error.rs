use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cohort '{0}' not found")]
    CohortNotFound(String),
    #[error("file '{0}' not found")]
    FileNotFound(String),
    #[error("a '{file_type}' file already exists for cohort '{cohort_id}'. Delete the existing file first")]
    DuplicateFileType {
        cohort_id: String,
        file_type: String,
    },
    #[error("blob '{0}' not found")]
    BlobNotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
