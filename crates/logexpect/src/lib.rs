//! logexpect: Ordered log-expectation matching for integration harnesses
//!
//! This crate verifies that a live stream of structured log records contains
//! an expected sequence of entries. Expectations are ordered patterns with
//! wildcard and back-reference fields plus a per-pattern skip budget, so a
//! test can assert the interesting records without enumerating every record
//! the system emits in between.
//!
//! # Features
//!
//! - **Ordered matching** with wildcard (`*`) and back-reference (`=`) fields
//! - **Bounded skip tolerance** so unrelated records cannot hide a failure
//! - **Background runs** on Tokio with a start/wait/cancel lifecycle
//! - **Declarative directives** applied through a [`Registry`]
//! - **Pluggable log sources** via the `logtap` cursor traits
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use logexpect::Registry;
//! use logtap::{MemLog, Side, Tag, Transaction};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> logexpect::Result<()> {
//! let mut registry = Registry::new();
//! let log = MemLog::new("v1");
//! registry.register_source("v1", Arc::new(log.clone()));
//!
//! log.push(
//!     Transaction::new(1001)
//!         .record(Tag::ReqStart, Side::Client, "127.0.0.1 39456")
//!         .record(Tag::ReqUrl, Side::Client, "/index.html"),
//! );
//!
//! registry
//!     .apply(&[
//!         "l1",
//!         "-v", "v1",
//!         "-d", "1",
//!         "expect 0 * ReqStart\nexpect 0 = ReqURL \"/index\"",
//!         "-run",
//!     ])
//!     .await?;
//! registry.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod directive;
mod dispatch;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod registry;

/// Re-export of the log source crate so consumers can name record and cursor
/// types without a separate dependency.
pub use logtap;

pub use cursor::ExpectCursor;
pub use engine::LogExpect;
pub use error::{ExpectError, Result};
pub use matcher::{Classification, Matcher, Progress, classify};
pub use pattern::{Expected, Pattern, SkipLimit, parse_spec};
pub use registry::Registry;
