//! logtap: structured transaction-log source abstraction
//!
//! This crate defines the data model and cursor seam a test harness uses
//! to consume a live, time-ordered stream of structured log records:
//! tagged [`Record`]s grouped into [`Transaction`]s, delivered in
//! [`Batch`]es by a polling [`LogCursor`]. Real deployments implement
//! [`LogSource`] over their log subsystem; [`MemLog`] is the in-tree
//! reference implementation used by tests and examples.
//!
//! # Example
//!
//! ```
//! use logtap::{CursorOpts, Direction, LogSource, MemLog, Side, Tag, Transaction};
//!
//! let log = MemLog::new("v1");
//! log.push(
//!     Transaction::new(1001)
//!         .record(Tag::ReqStart, Side::Client, "")
//!         .record(Tag::ReqUrl, Side::Client, "/index.html"),
//! );
//!
//! let handle = log.open()?;
//! let opts = CursorOpts {
//!     direction: Direction::FromStart,
//!     ..CursorOpts::default()
//! };
//! let mut cursor = handle.cursor(&opts)?;
//! let batch = cursor.next_batch()?.unwrap();
//! assert_eq!(batch[0].vxid(), 1001);
//! # Ok::<(), logtap::SourceError>(())
//! ```

pub mod cursor;
pub mod error;
pub mod mem;
pub mod query;
pub mod record;
pub mod tag;

pub use cursor::{CursorOpts, Direction, Grouping, LogCursor, LogHandle, LogSource, RecordFilter};
pub use error::{Result, SourceError};
pub use mem::MemLog;
pub use query::Query;
pub use record::{Batch, Record, Side, Transaction};
pub use tag::Tag;

// Payloads are plain byte buffers; re-exported so consumers do not need
// their own `bytes` dependency just to build records.
pub use bytes::Bytes;
