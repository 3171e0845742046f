//! Error types for the sweep harness
//!
//! Only configuration and output-sink problems are errors. Anything that goes
//! wrong inside a single trial is recorded as a [`crate::solver::SolverOutcome`]
//! instead and never reaches this type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, SweepError>;

/// Sweep harness error types
#[derive(Error, Debug)]
pub enum SweepError {
    /// The sweep declaration cannot produce valid trials
    #[error("invalid sweep configuration: {0}")]
    Config(String),

    /// A scenario file could not be read or contains no usable rows
    #[error("scenario {path}: {reason}")]
    Scenario {
        /// Scenario file path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The existing output file was written for a different experiment
    #[error("output {path} has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        /// Output file path
        path: PathBuf,
        /// Header found on disk
        found: Vec<String>,
        /// Header this sweep would write
        expected: Vec<String>,
    },

    /// A row does not have one field per header column
    #[error("row has {found} fields, header has {expected}")]
    RowShape {
        /// Header width
        expected: usize,
        /// Row width
        found: usize,
    },

    /// The output destination could not be created or appended to
    #[error("result sink {path}: {source}")]
    Sink {
        /// Output file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding/decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Sweep file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SweepError::Config(msg.into())
    }

    pub(crate) fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Sink {
            path: path.into(),
            source,
        }
    }
}
