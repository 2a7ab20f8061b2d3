//! Error types for the tab catalog.
//!
//! Library crates use [`TabCatalogError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all tab catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum TabCatalogError {
    /// Configuration or credential loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the tab source or a page.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed text that could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A categorization backend failed (transport, status, or payload).
    #[error("backend error: {0}")]
    Backend(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad path, existing destination, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON (de)serialization error for snapshot files.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The catalog is being mutated by another writer.
    #[error("catalog is locked: {0}")]
    Lock(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TabCatalogError>;

impl TabCatalogError {
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

    /// True when the error is an I/O "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
