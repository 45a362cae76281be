use consult_types::{CaseName, TextError};

#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("case not found: {0}")]
    CaseNotFound(CaseName),
    #[error("failed to read case file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to list cases directory: {0}")]
    DirRead(std::io::Error),
    #[error("case {case} schema mismatch at {path}: {message}")]
    CaseSchema {
        case: String,
        path: String,
        message: String,
    },
    #[error("failed to deserialize case: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to write page: {0}")]
    FileWrite(std::io::Error),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
}

pub type ConsultResult<T> = std::result::Result<T, ConsultError>;
