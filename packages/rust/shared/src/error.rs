//! Error types for coursepack.
//!
//! Library crates use [`CoursepackError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all coursepack operations.
#[derive(Debug, thiserror::Error)]
pub enum CoursepackError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while retrieving captions.
    #[error("network error: {0}")]
    Network(String),

    /// Markup, subtitle, or XML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The syllabus page has no course navigation container.
    #[error("no course navigation found in {path:?}")]
    Navigation { path: PathBuf },

    /// Course metadata document is missing a required field.
    #[error("metadata error: {message}")]
    Metadata { message: String },

    /// Zip or tar archive error.
    #[error("archive error: {0}")]
    Archive(String),

    /// Output serialization error.
    #[error("export error: {0}")]
    Export(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input path, invalid caption URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoursepackError>;

impl CoursepackError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a metadata error from any displayable message.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
