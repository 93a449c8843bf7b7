//! The source / handle / cursor seam.
//!
//! Consumers reach a log through three object-safe traits: a
//! [`LogSource`] names an instance and can be opened into a
//! [`LogHandle`]; a handle builds [`LogCursor`]s honoring a set of
//! [`CursorOpts`]; a cursor is polled for [`Batch`]es of completed
//! transactions. Handles and cursors are `Send` so a background task can
//! own them outright, and dropping them releases the underlying
//! attachment.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{Batch, Record, Side};
use crate::tag::Tag;

/// Where a fresh cursor starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Replay everything the source retains, then keep tailing.
    FromStart,
    /// Start at the current end of the log and only see new activity.
    #[default]
    Tail,
}

/// Policy for aggregating records into transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// One transaction per session, containing all its requests.
    Session,
    /// One transaction per request.
    Request,
    /// One transaction per identifier.
    #[default]
    Vxid,
    /// No grouping; every record stands alone.
    Raw,
}

impl Grouping {
    /// The lowercase name used in directives.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Request => "request",
            Self::Vxid => "vxid",
            Self::Raw => "raw",
        }
    }

    /// Resolve a grouping-mode name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Session, Self::Request, Self::Vxid, Self::Raw]
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-record selector applied by the source before records reach the
/// consumer.
///
/// Pseudo-records always pass, whatever the selector says, so batch
/// delimiters survive filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    side: Option<Side>,
    tags: Option<HashSet<Tag>>,
}

impl RecordFilter {
    /// Restrict to records from one side of the conversation. Records
    /// attributable to neither side still pass.
    #[must_use]
    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Restrict to records carrying one of the given tags.
    #[must_use]
    pub fn include_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.get_or_insert_with(HashSet::new).extend(tags);
        self
    }

    /// Whether any restriction is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.side.is_none() && self.tags.is_none()
    }

    /// Whether `record` passes this selector.
    #[must_use]
    pub fn admits(&self, record: &Record) -> bool {
        if record.tag().is_pseudo() {
            return true;
        }
        if let Some(side) = self.side {
            if record.side() != side && record.side() != Side::Neither {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.contains(&record.tag()) {
                return false;
            }
        }
        true
    }
}

/// Everything a cursor needs to know at construction time.
#[derive(Debug, Clone, Default)]
pub struct CursorOpts {
    /// Where to start reading.
    pub direction: Direction,
    /// How to aggregate records into transactions.
    pub grouping: Grouping,
    /// Optional transaction-level query expression (see [`crate::query`]).
    pub query: Option<String>,
    /// Per-record selector.
    pub filter: RecordFilter,
    /// Compile query regexes case-insensitively.
    pub caseless: bool,
}

/// A named log instance that can be attached to.
pub trait LogSource: Send + Sync {
    /// The instance name, used in diagnostics and error reports.
    fn name(&self) -> &str;

    /// Attach to the instance.
    fn open(&self) -> Result<Box<dyn LogHandle>>;
}

/// An open attachment to a log instance.
pub trait LogHandle: Send {
    /// Build a cursor over the instance honoring `opts`.
    ///
    /// Query-expression problems surface here, not at first poll.
    fn cursor(&self, opts: &CursorOpts) -> Result<Box<dyn LogCursor>>;
}

/// A polling cursor over completed transactions.
pub trait LogCursor: Send {
    /// Return the next batch of transactions.
    ///
    /// `Ok(None)` means nothing new is available right now; a tailing
    /// consumer should wait briefly and poll again.
    fn next_batch(&mut self) -> Result<Option<Batch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_names_round_trip() {
        for g in [
            Grouping::Session,
            Grouping::Request,
            Grouping::Vxid,
            Grouping::Raw,
        ] {
            assert_eq!(Grouping::from_name(g.name()), Some(g));
        }
        assert_eq!(Grouping::from_name("SESSION"), Some(Grouping::Session));
        assert_eq!(Grouping::from_name("bogus"), None);
    }

    #[test]
    fn defaults_are_tail_and_vxid() {
        let opts = CursorOpts::default();
        assert_eq!(opts.direction, Direction::Tail);
        assert_eq!(opts.grouping, Grouping::Vxid);
        assert!(opts.query.is_none());
        assert!(opts.filter.is_empty());
        assert!(!opts.caseless);
    }

    #[test]
    fn filter_side_keeps_neutral_records() {
        let filter = RecordFilter::default().side(Side::Client);
        assert!(filter.admits(&Record::new(1, Tag::ReqStart, Side::Client, "")));
        assert!(!filter.admits(&Record::new(1, Tag::BackendOpen, Side::Backend, "")));
        assert!(filter.admits(&Record::new(1, Tag::Timestamp, Side::Neither, "")));
    }

    #[test]
    fn filter_tags_restrict() {
        let filter = RecordFilter::default().include_tags([Tag::Hit, Tag::Miss]);
        assert!(filter.admits(&Record::new(1, Tag::Hit, Side::Client, "")));
        assert!(!filter.admits(&Record::new(1, Tag::ReqUrl, Side::Client, "/")));
    }

    #[test]
    fn filter_always_admits_pseudo_records() {
        let filter = RecordFilter::default()
            .side(Side::Backend)
            .include_tags([Tag::Hit]);
        assert!(filter.admits(&Record::batch_marker()));
    }
}
