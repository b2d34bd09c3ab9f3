use hl_catalog::CatalogError;
use hl_core::{CoreError, ErrorKind};

pub type ManningResult<T> = Result<T, ManningError>;

#[derive(thiserror::Error, Debug)]
pub enum ManningError {
    #[error("No per-cell roughness data found (searched {searched} locations)")]
    NoRoughnessData { searched: usize },

    #[error("No plausible roughness values in {source_name}")]
    NoPlausibleValues { source_name: String },

    #[error("Invalid calibration for zone {zone}: {reason}")]
    InvalidOverride { zone: u32, reason: String },

    #[error("Mesh has no area to distribute")]
    ZeroArea,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ManningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManningError::NoRoughnessData { .. } => ErrorKind::DatasetMissing,
            ManningError::NoPlausibleValues { .. }
            | ManningError::InvalidOverride { .. }
            | ManningError::ZeroArea => ErrorKind::ComputationError,
            ManningError::Catalog(e) => e.kind(),
            ManningError::Core(e) => e.kind(),
        }
    }
}
