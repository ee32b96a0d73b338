use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the analysis pipeline.
///
/// Provider and calculator errors abort the run; `Render` errors are
/// isolated per chart and never stop the textual report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load dataset from {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("dataset category '{category}' is missing required field '{field}'")]
    MissingField { category: String, field: String },

    #[error("invalid cost constant '{name}' = {value}; must be positive")]
    InvalidCostConstants { name: String, value: f64 },

    #[error("{what}: investment cost must be positive, got {value}")]
    DivisionByZero { what: String, value: f64 },

    #[error("cannot render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
