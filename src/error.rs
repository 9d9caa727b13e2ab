use thiserror::Error;

/// Main error type for CMREval
#[derive(Error, Debug)]
pub enum CmrevalError {
    /// Dimensionality or row-count mismatch between embedding sets
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Zero-length embedding set or rank list
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Grouping invariant violated or index outside its matrix
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Fold/shard/group parameters incompatible with the input
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed embedding or label file content
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenient Result type using CmrevalError
pub type Result<T> = std::result::Result<T, CmrevalError>;
