//! Error types for the hl-app pipeline layer.

use std::path::PathBuf;

use hl_catalog::CatalogError;
use hl_core::{CoreError, ErrorKind};
use hl_export::ExportError;
use hl_manning::ManningError;
use hl_mesh::MeshError;
use hl_sections::SectionError;
use hl_series::SeriesError;
use hl_terrain::TerrainError;

/// Any failure of a pipeline request. Stage errors keep their type so the
/// envelope can report their [`ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Manning(#[from] ManningError),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read config file: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Catalog(e) => e.kind(),
            AppError::Mesh(e) => e.kind(),
            AppError::Terrain(e) => e.kind(),
            AppError::Manning(e) => e.kind(),
            AppError::Section(e) => e.kind(),
            AppError::Series(e) => e.kind(),
            AppError::Export(e) => e.kind(),
            AppError::Core(e) => e.kind(),
            AppError::InvalidRequest(_) | AppError::Encode(_) => ErrorKind::ComputationError,
            AppError::ConfigRead { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::FileNotFound
            }
            AppError::ConfigRead { .. } | AppError::ConfigParse { .. } => ErrorKind::UnsupportedFormat,
        }
    }
}
