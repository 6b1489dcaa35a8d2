use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid cohort id: {0:?}")]
    InvalidCohortId(String),
    #[error("invalid file id: {0:?}")]
    InvalidFileId(String),
    #[error("unknown file type: {0:?}")]
    UnknownFileType(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
