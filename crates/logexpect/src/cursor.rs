//! The expectation cursor.
//!
//! An [`ExpectCursor`] walks the compiled pattern list in order and
//! carries the running match state: the skip counter for the active
//! pattern and the vxid/tag recorded by the most recent successful
//! match. The position only ever moves forward; once the list is
//! exhausted the cursor stays done.

use std::sync::Arc;

use logtap::Tag;

use crate::pattern::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Pending,
    At(usize),
    Done,
}

/// Ordered walk over a compiled pattern list with running match state.
#[derive(Debug)]
pub struct ExpectCursor {
    name: String,
    patterns: Arc<[Pattern]>,
    pos: Position,
    skip_count: u32,
    last_vxid: Option<u32>,
    last_tag: Option<Tag>,
}

impl ExpectCursor {
    /// Create a cursor positioned before the first pattern.
    pub fn new(name: impl Into<String>, patterns: Arc<[Pattern]>) -> Self {
        Self {
            name: name.into(),
            patterns,
            pos: Position::Pending,
            skip_count: 0,
            last_vxid: None,
            last_tag: None,
        }
    }

    /// Return to the pre-start state: before the first pattern, zero
    /// skips, no match history.
    pub fn reset(&mut self) {
        self.pos = Position::Pending;
        self.skip_count = 0;
        self.last_vxid = None;
        self.last_tag = None;
    }

    /// Move to the next pattern, or to done when the list is exhausted.
    ///
    /// The skip counter is pattern-scoped, so every advance clears it.
    /// An empty list is exhausted by the first advance.
    pub fn advance(&mut self) {
        self.pos = match self.pos {
            Position::Pending if self.patterns.is_empty() => Position::Done,
            Position::Pending => Position::At(0),
            Position::At(i) if i + 1 < self.patterns.len() => Position::At(i + 1),
            Position::At(_) | Position::Done => Position::Done,
        };
        self.skip_count = 0;
        if let Position::At(i) = self.pos {
            tracing::debug!(name = %self.name, pattern = %self.patterns[i], "expecting");
        }
    }

    /// The pattern records are currently checked against, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Pattern> {
        match self.pos {
            Position::At(i) => self.patterns.get(i),
            Position::Pending | Position::Done => None,
        }
    }

    /// Whether the pattern list has been exhausted.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.pos, Position::Done)
    }

    /// Skips charged against the active pattern so far.
    #[must_use]
    pub const fn skip_count(&self) -> u32 {
        self.skip_count
    }

    /// The vxid of the most recent successful match, if any.
    #[must_use]
    pub const fn last_vxid(&self) -> Option<u32> {
        self.last_vxid
    }

    /// The tag of the most recent successful match, if any.
    #[must_use]
    pub const fn last_tag(&self) -> Option<Tag> {
        self.last_tag
    }

    /// Record a successful match against the active pattern.
    pub fn record_match(&mut self, vxid: u32, tag: Tag) {
        self.last_vxid = Some(vxid);
        self.last_tag = Some(tag);
        self.skip_count = 0;
    }

    /// Charge one skip against the active pattern. The counter
    /// saturates at `u32::MAX`; an unlimited budget never reads it.
    pub fn note_skip(&mut self) {
        self.skip_count = self.skip_count.saturating_add(1);
    }

    /// The owning engine's name, carried for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
