use thiserror::Error;

/// Errors returned by the boosting library.
#[derive(Debug, Error)]
pub enum BoostError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("training labels contain a single class ({0}); both classes are required")]
    SingleClass(u8),

    #[error("column `{name}` has {actual} rows, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate feature name `{0}`")]
    DuplicateFeature(String),

    #[error("categorical feature `{0}` is not a pool column")]
    UnknownFeature(String),

    #[error("feature `{name}` row {row}: `{value}` is not numeric")]
    InvalidFeature {
        name: String,
        row: usize,
        value: String,
    },

    #[error("invalid label: {0}")]
    InvalidLabel(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("model validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for boosting operations
pub type Result<T> = std::result::Result<T, BoostError>;
