use std::path::PathBuf;

use hl_core::ErrorKind;

pub type TerrainResult<T> = Result<T, TerrainError>;

#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    #[error("Raster not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported raster {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Invalid raster: {0}")]
    Invalid(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerrainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TerrainError::FileNotFound { .. } => ErrorKind::FileNotFound,
            TerrainError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            TerrainError::Invalid(_) => ErrorKind::ComputationError,
            TerrainError::Tiff(_) => ErrorKind::CorruptedStructure,
            TerrainError::Io(_) => ErrorKind::CorruptedStructure,
        }
    }
}
