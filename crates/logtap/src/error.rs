//! Error types for logtap.
//!
//! Everything a log source can fail with funnels into [`SourceError`] so
//! that consumers see one taxonomy regardless of the backing
//! implementation.

use thiserror::Error;

/// Failures reported by log sources, handles, and cursors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be opened.
    #[error("failed to open log source '{name}': {reason}")]
    Open {
        /// The source that could not be opened.
        name: String,
        /// The reason for the failure.
        reason: String,
    },

    /// A cursor could not be constructed or read.
    #[error("log cursor error: {reason}")]
    Cursor {
        /// The reason for the failure.
        reason: String,
    },

    /// A query-filter expression did not compile.
    #[error("invalid query expression: {message}")]
    Query {
        /// What was wrong with the expression.
        message: String,
    },

    /// The source was detached while in use.
    #[error("log source '{name}' is closed")]
    Closed {
        /// The source that went away.
        name: String,
    },
}

impl SourceError {
    /// Create an open failure.
    pub fn open(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Open {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a cursor failure.
    pub fn cursor(reason: impl Into<String>) -> Self {
        Self::Cursor {
            reason: reason.into(),
        }
    }

    /// Create a query-expression failure.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a closed-source failure.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }

    /// Check if this error reports a detached source.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Result type alias for logtap operations.
pub type Result<T> = std::result::Result<T, SourceError>;
