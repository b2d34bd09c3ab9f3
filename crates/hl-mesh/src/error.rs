use hl_catalog::CatalogError;
use hl_core::{CoreError, ErrorKind};

pub type MeshResult<T> = Result<T, MeshError>;

#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("No 2D flow areas in container")]
    NoFlowAreas,

    #[error("2D flow area '{name}' not found (available: {available:?})")]
    AreaNotFound { name: String, available: Vec<String> },

    #[error("Flow area '{area}' has no '{dataset}' dataset")]
    DatasetMissing { area: String, dataset: String },

    #[error("Dataset {path} has shape {actual:?}, expected {expected}")]
    BadShape {
        path: String,
        expected: &'static str,
        actual: Vec<usize>,
    },

    #[error("Degenerate cell {cell} in '{area}': {reason}")]
    DegenerateCell {
        area: String,
        cell: usize,
        reason: String,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::NoFlowAreas
            | MeshError::AreaNotFound { .. }
            | MeshError::DatasetMissing { .. } => ErrorKind::DatasetMissing,
            MeshError::BadShape { .. } => ErrorKind::CorruptedStructure,
            MeshError::DegenerateCell { .. } => ErrorKind::ComputationError,
            MeshError::Catalog(e) => e.kind(),
            MeshError::Core(e) => e.kind(),
        }
    }
}
