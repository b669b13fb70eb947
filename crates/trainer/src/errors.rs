use std::path::PathBuf;

use ctr_boost::BoostError;
use thiserror::Error;

/// Errors raised by the CTR pipeline. None are retried; all are fatal to a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("column `{0}` has no values to impute from")]
    EmptyColumn(String),

    #[error("fit failure: {0}")]
    FitFailure(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Parse(err.to_string())
    }
}

impl From<BoostError> for PipelineError {
    fn from(err: BoostError) -> Self {
        PipelineError::FitFailure(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
