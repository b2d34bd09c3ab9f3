//! Catalog error types.

use std::path::PathBuf;

use hl_core::{CoreError, ErrorKind};

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported format for {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Corrupted structure at {path}: {reason}")]
    CorruptedStructure { path: String, reason: String },

    #[error("Dataset not found: {path}")]
    DatasetMissing { path: String },

    #[error("Node {path} is not a {expected}")]
    WrongKind { path: String, expected: &'static str },

    #[error("Invalid selection on {path}: {reason}")]
    InvalidSelection { path: String, reason: String },

    #[error("Container backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::FileNotFound { .. } => ErrorKind::FileNotFound,
            CatalogError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            CatalogError::CorruptedStructure { .. } => ErrorKind::CorruptedStructure,
            CatalogError::DatasetMissing { .. } | CatalogError::WrongKind { .. } => {
                ErrorKind::DatasetMissing
            }
            CatalogError::InvalidSelection { .. } => ErrorKind::ComputationError,
            CatalogError::Backend(_) | CatalogError::Io(_) => ErrorKind::CorruptedStructure,
            CatalogError::Core(e) => e.kind(),
        }
    }

    pub(crate) fn corrupted(path: &str, reason: impl Into<String>) -> Self {
        CatalogError::CorruptedStructure {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(path: &str) -> Self {
        CatalogError::DatasetMissing {
            path: path.to_string(),
        }
    }
}
