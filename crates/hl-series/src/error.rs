use hl_catalog::CatalogError;
use hl_core::{CoreError, ErrorKind};

pub type SeriesResult<T> = Result<T, SeriesError>;

#[derive(thiserror::Error, Debug)]
pub enum SeriesError {
    #[error("No time series found for '{source_name}'")]
    SourceNotFound { source_name: String },

    #[error("Invalid series source '{source_name}': {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("Cell {index} out of range for area '{area}' ({cells} cells)")]
    CellOutOfRange {
        area: String,
        index: usize,
        cells: usize,
    },

    #[error("Dataset {path} has shape {actual:?}, expected {expected}")]
    BadShape {
        path: String,
        expected: &'static str,
        actual: Vec<usize>,
    },

    #[error("Timestamps of '{source_name}' not strictly increasing at index {index} ({previous} then {current})")]
    NonMonotonic {
        source_name: String,
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Time series '{source_name}' has no valid samples")]
    Empty { source_name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SeriesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeriesError::SourceNotFound { .. } | SeriesError::CellOutOfRange { .. } => {
                ErrorKind::DatasetMissing
            }
            SeriesError::BadShape { .. } => ErrorKind::CorruptedStructure,
            SeriesError::InvalidSource { .. }
            | SeriesError::NonMonotonic { .. }
            | SeriesError::Empty { .. } => ErrorKind::ComputationError,
            SeriesError::Catalog(e) => e.kind(),
            SeriesError::Core(e) => e.kind(),
        }
    }
}
