use std::io;
use std::path::{Path, PathBuf};

use hl_core::{CoreError, ErrorKind};
use hl_sections::SectionError;
use hl_terrain::TerrainError;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Output {} is being written by another export", path.display())]
    Collision { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Field '{field}' has {actual} values, mesh has {expected} cells")]
    FieldLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported export target {}: {reason}", path.display())]
    UnsupportedTarget { path: PathBuf, reason: String },

    #[error("Malformed export file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoTIFF error: {0}")]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Collision { .. }
            | ExportError::Io { .. }
            | ExportError::Csv(_)
            | ExportError::Json(_)
            | ExportError::Terrain(_) => ErrorKind::ExportIoError,
            ExportError::FieldLength { .. } | ExportError::InvalidRequest(_) => {
                ErrorKind::ComputationError
            }
            ExportError::UnsupportedTarget { .. } => ErrorKind::UnsupportedFormat,
            ExportError::Malformed { .. } => ErrorKind::CorruptedStructure,
            ExportError::Section(e) => e.kind(),
            ExportError::Core(e) => e.kind(),
        }
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
        move |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
