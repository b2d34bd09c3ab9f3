use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failure taxonomy visible at the pipeline boundary.
///
/// Every stage error maps onto exactly one kind so callers can branch on
/// the class of failure without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFormat,
    CorruptedStructure,
    DatasetMissing,
    ComputationError,
    #[cfg_attr(feature = "serde", serde(rename = "ExportIOError"))]
    ExportIoError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::CorruptedStructure => "CorruptedStructure",
            ErrorKind::DatasetMissing => "DatasetMissing",
            ErrorKind::ComputationError => "ComputationError",
            ErrorKind::ExportIoError => "ExportIOError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Degenerate geometry: {what}")]
    Degenerate { what: String },

    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::ComputationError,
        }
    }
}
