use hl_core::{CoreError, ErrorKind};

pub type SectionResult<T> = Result<T, SectionError>;

#[derive(thiserror::Error, Debug)]
pub enum SectionError {
    #[error("Alignment needs at least 2 distinct points, got {count}")]
    TooFewPoints { count: usize },

    #[error("Invalid {what}: {value}")]
    InvalidParameter { what: &'static str, value: f64 },

    #[error("Spacing {spacing} over {length} gives more than {max} stations")]
    TooManyStations { length: f64, spacing: f64, max: usize },

    #[error("No elevation data in section {section}")]
    NoElevations { section: usize },

    #[error("Root finding for {what} did not converge")]
    NoConvergence { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SectionError::Core(e) => e.kind(),
            _ => ErrorKind::ComputationError,
        }
    }

    pub(crate) fn positive(what: &'static str, value: f64) -> Result<f64, SectionError> {
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(SectionError::InvalidParameter { what, value })
        }
    }
}
