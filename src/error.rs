//! Error taxonomy for the pipeline.
//!
//! File-level errors carry the offending path so a batch run can report
//! which recording failed. [`Error::is_recoverable`] tells a batch driver
//! whether to skip the recording (or region) and keep going.
use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A column required by the channel map or configuration is absent.
    #[error("{}: missing column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A column the merger needs (time or TTL) is absent from a loaded frame.
    #[error("missing required column '{column}'")]
    MissingRequiredColumn { column: String },

    /// Zero usable rows after dropping missing values.
    #[error("{}: no usable rows", path.display())]
    EmptyInput { path: PathBuf },

    /// Zero (or non-finite) standard deviation during z-scoring.
    #[error("degenerate signal in region '{region}' channel '{channel}': zero variance")]
    DegenerateSignal { region: String, channel: String },

    #[error("{what}: need at least {needed} samples, got {got}")]
    TooShort { what: String, needed: usize, got: usize },

    #[error("series length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{}: row {row}, column '{column}': cannot parse '{value}' as a number", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// `true` when the failure concerns only the data of one recording or
    /// region, so a multi-mouse run should log it and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EmptyInput { .. } | Error::DegenerateSignal { .. })
    }
}
