//! Error types for MultiLookup.
//!
//! Library crates use [`MultiLookupError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all MultiLookup operations.
#[derive(Debug, thiserror::Error)]
pub enum MultiLookupError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A dynamic property name that is not `<operation>.<attribute>`.
    #[error("invalid property name \"{name}\": name must be in format \"<operation_name>.<property>\"")]
    PropertyName { name: String },

    /// A record path expression that failed to compile.
    #[error("invalid record path \"{path}\": {message}")]
    PathSyntax { path: String, message: String },

    /// A record path that selected no field in the record.
    #[error("path \"{path}\" not in schema")]
    PathNotInSchema { path: String },

    /// The lookup backend could not resolve the coordinates.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Record content could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Records could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// An operation failed while every operation must pass.
    #[error("all must pass, and failure encountered in operation \"{operation}\": {source}")]
    AllMustPass {
        operation: String,
        source: Box<MultiLookupError>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MultiLookupError>;

impl MultiLookupError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a lookup failure from any displayable message.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a path syntax error for the given expression.
    pub fn path_syntax(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PathSyntax {
            path: path.into(),
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
