//! Exit codes for the `rew` CLI.
//!
//! Exit codes communicate the outcome of a pipeline stage without requiring
//! output parsing. They are stable across releases.

use rew_common::{Error, ErrorCategory};

/// Exit codes for `rew` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Stage completed
    Clean = 0,

    /// Completed, but data-quality warnings were recorded
    CompletedWithWarnings = 1,

    /// Configuration error (missing key, invalid value)
    ConfigError = 10,

    /// Input table schema error (missing column, duplicate key, bad cell)
    SchemaError = 11,

    /// Training or model artifact error
    ModelError = 12,

    /// Dataset or CSV storage error
    StorageError = 13,

    /// I/O error
    IoError = 14,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::CompletedWithWarnings)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Exit code for a failed operation.
    pub fn from_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Configuration => ExitCode::ConfigError,
            ErrorCategory::Schema => ExitCode::SchemaError,
            ErrorCategory::Training => ExitCode::ModelError,
            ErrorCategory::Storage => ExitCode::StorageError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
