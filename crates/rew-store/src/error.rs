//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur while building, writing or reading tables.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow array or schema error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding/decoding error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Column length differs from the table row count
    #[error("column '{column}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Column name already present
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// Column type this crate does not map
    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },

    /// A table with no columns cannot be written
    #[error("table has no columns")]
    EmptyTable,

    /// Stored value outside the representable range
    #[error("column '{column}' holds out-of-range value {value}")]
    OutOfRange { column: String, value: i64 },

    /// Stored schema version cannot be read by this build
    #[error("incompatible dataset schema version {found} (expected {expected})")]
    IncompatibleVersion { found: String, expected: String },
}

impl From<StoreError> for rew_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => rew_common::Error::Io(e),
            other => rew_common::Error::Storage(other.to_string()),
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
