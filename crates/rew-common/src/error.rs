//! Error types for Resilience Early Warning.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the pipeline.
///
/// Every variant is fatal for the run that raised it. Recoverable data-quality
/// problems are never errors; they are counted and logged by the stage that
/// recovers from them.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required configuration key: {key}")]
    MissingConfigKey { key: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Schema errors (20-29)
    #[error("schema error: {0}")]
    Schema(String),

    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table} table has duplicate key {key}")]
    DuplicateKey { table: String, key: String },

    #[error("monthly rows are not sorted by (entity, period) at row {index}: {detail}")]
    UnsortedInput { index: usize, detail: String },

    #[error("{table} table row {row}, column '{column}': cannot parse '{value}'")]
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    // Training and model errors (30-39)
    #[error("training failed: {0}")]
    Training(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("model integrity check failed: expected hash {expected}, got {actual}")]
    ModelIntegrity { expected: String, actual: String },

    // Storage errors (40-49)
    #[error("storage error: {0}")]
    Storage(String),

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category, used to pick process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Schema,
    Training,
    Storage,
    Io,
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MissingConfigKey { .. } => 11,
            Error::InvalidConfig(_) => 12,
            Error::Schema(_) => 20,
            Error::MissingColumn { .. } => 21,
            Error::DuplicateKey { .. } => 22,
            Error::UnsortedInput { .. } => 23,
            Error::InvalidValue { .. } => 24,
            Error::Training(_) => 30,
            Error::Model(_) => 31,
            Error::ModelIntegrity { .. } => 32,
            Error::Storage(_) => 40,
            Error::Csv { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Category derived from the code decade.
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            10..=19 => ErrorCategory::Configuration,
            20..=29 => ErrorCategory::Schema,
            30..=39 => ErrorCategory::Training,
            40..=49 => ErrorCategory::Storage,
            _ => ErrorCategory::Io,
        }
    }

    pub fn missing_column(table: &str, column: &str) -> Self {
        Error::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn csv(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Error::Csv {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
