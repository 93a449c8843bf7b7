//! Error types for logexpect.
//!
//! Failures split along the lines a harness cares about: configuration
//! problems surface synchronously from the call that caused them,
//! source problems either synchronously at start or at wait, and match
//! failures and cancellations only ever at wait, because that is when
//! the background run's outcome becomes visible.

use logtap::{Record, SourceError, Tag};
use thiserror::Error;

/// The main error type for logexpect operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// A directive or expectation line could not be parsed.
    #[error("syntax error: {message}")]
    Syntax {
        /// What was malformed.
        message: String,
    },

    /// A tag name outside the source's vocabulary.
    #[error("unknown tag name '{name}'")]
    UnknownTag {
        /// The name that did not resolve.
        name: String,
    },

    /// An expectation regex did not compile.
    #[error("regex error in '{pattern}': {source}")]
    BadRegex {
        /// The regex literal as written.
        pattern: String,
        /// The compiler's diagnostic.
        #[source]
        source: regex::Error,
    },

    /// An engine was asked to do something its configuration does not
    /// allow.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The log source failed.
    #[error("log source error: {0}")]
    Source(#[from] SourceError),

    /// A record neither matched the active expectation nor fit its skip
    /// budget.
    #[error("expectation failed: expected '{expected}', got {vxid} {tag} '{payload}'")]
    ExpectationFailed {
        /// The failing expectation, as written.
        expected: String,
        /// The offending record's transaction identifier.
        vxid: u32,
        /// The offending record's tag.
        tag: Tag,
        /// The offending record's payload, rendered as text.
        payload: String,
    },

    /// The background run was cancelled before reaching a verdict.
    #[error("logexpect '{name}' cancelled")]
    Cancelled {
        /// The engine whose run was cancelled.
        name: String,
    },

    /// `wait` was called on an engine that was never started.
    #[error("logexpect '{name}' is not started")]
    NotStarted {
        /// The engine that is not running.
        name: String,
    },
}

impl ExpectError {
    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Create an unknown-tag error.
    pub fn unknown_tag(name: impl Into<String>) -> Self {
        Self::UnknownTag { name: name.into() }
    }

    /// Create a regex-compilation error.
    pub fn bad_regex(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::BadRegex {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a match-failure error from the failing expectation and the
    /// record that broke it.
    pub fn expectation_failed(expected: impl Into<String>, record: &Record) -> Self {
        Self::ExpectationFailed {
            expected: expected.into(),
            vxid: record.vxid(),
            tag: record.tag(),
            payload: record.payload_text().into_owned(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(name: impl Into<String>) -> Self {
        Self::Cancelled { name: name.into() }
    }

    /// Create a not-started error.
    pub fn not_started(name: impl Into<String>) -> Self {
        Self::NotStarted { name: name.into() }
    }

    /// Check if this error was raised before any background run began.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::UnknownTag { .. }
                | Self::BadRegex { .. }
                | Self::Config { .. }
                | Self::NotStarted { .. }
        )
    }

    /// Check if this error reports a failed expectation.
    #[must_use]
    pub const fn is_expectation_failure(&self) -> bool {
        matches!(self, Self::ExpectationFailed { .. })
    }

    /// Check if this error reports a cancelled run.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type alias for logexpect operations.
pub type Result<T> = std::result::Result<T, ExpectError>;
