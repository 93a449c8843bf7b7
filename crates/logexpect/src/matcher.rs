//! Record classification and its effects on the expectation state.
//!
//! [`classify`] is the pure verdict for one record against one pattern;
//! [`Matcher`] applies verdicts to an [`ExpectCursor`], emitting the
//! match/err diagnostics and turning a budget overrun into the terminal
//! [`ExpectError::ExpectationFailed`].

use std::sync::Arc;

use logtap::{Record, Tag};

use crate::cursor::ExpectCursor;
use crate::error::{ExpectError, Result};
use crate::pattern::{Expected, Pattern};

/// Verdict for one record against one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The record satisfies the pattern.
    Match,
    /// The record does not satisfy the pattern but fits the skip budget.
    Skip,
    /// The record does not satisfy the pattern and the budget is spent.
    Fail,
}

/// Classify `record` against `pattern`, given the running match state.
#[must_use]
pub fn classify(
    pattern: &Pattern,
    record: &Record,
    last_vxid: Option<u32>,
    last_tag: Option<Tag>,
    skip_count: u32,
) -> Classification {
    let mut ok = pattern.vxid().admits(record.vxid(), last_vxid)
        && pattern.tag().admits(record.tag(), last_tag);

    // The payload regex is scoped to one exact tag; under a wildcard or
    // back-reference tag matcher it is never consulted.
    if let (Expected::Exact(tag), Some(re)) = (pattern.tag(), pattern.regex()) {
        if tag == record.tag() && !re.is_match(record.payload()) {
            ok = false;
        }
    }

    if ok {
        Classification::Match
    } else if pattern.skip().allows(skip_count) {
        Classification::Skip
    } else {
        Classification::Fail
    }
}

/// What feeding one record did to the expectation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Pseudo-record; invisible to matching.
    Ignored,
    /// Charged against the active pattern's skip budget.
    Skipped,
    /// Matched the active pattern; more patterns remain.
    Matched,
    /// Matched the final pattern; the run is satisfied.
    Complete,
}

/// Stateful matcher over an ordered pattern list.
#[derive(Debug)]
pub struct Matcher {
    cursor: ExpectCursor,
}

impl Matcher {
    /// Build a matcher over `patterns`, stepped to the first
    /// expectation. An empty list is complete from the outset.
    pub fn new(name: impl Into<String>, patterns: Arc<[Pattern]>) -> Self {
        let mut cursor = ExpectCursor::new(name, patterns);
        cursor.advance();
        Self { cursor }
    }

    /// Whether every pattern has been satisfied.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    /// Feed one record, in stream order.
    ///
    /// Pseudo-records are ignored entirely. On a match the last-matched
    /// vxid and tag are recorded and the cursor advances; a record that
    /// neither matches nor fits the skip budget ends the run with
    /// [`ExpectError::ExpectationFailed`].
    pub fn feed(&mut self, record: &Record) -> Result<Progress> {
        if record.tag().is_pseudo() {
            return Ok(Progress::Ignored);
        }
        let Some(pattern) = self.cursor.active() else {
            return Ok(Progress::Complete);
        };

        match classify(
            pattern,
            record,
            self.cursor.last_vxid(),
            self.cursor.last_tag(),
            self.cursor.skip_count(),
        ) {
            Classification::Match => {
                tracing::debug!(
                    name = %self.cursor.name(),
                    vxid = record.vxid(),
                    tag = %record.tag(),
                    side = %record.side().indicator(),
                    payload = %record.payload_text(),
                    "match"
                );
                self.cursor.record_match(record.vxid(), record.tag());
                self.cursor.advance();
                if self.cursor.is_done() {
                    Ok(Progress::Complete)
                } else {
                    Ok(Progress::Matched)
                }
            }
            Classification::Skip => {
                self.cursor.note_skip();
                Ok(Progress::Skipped)
            }
            Classification::Fail => {
                tracing::error!(
                    name = %self.cursor.name(),
                    vxid = record.vxid(),
                    tag = %record.tag(),
                    side = %record.side().indicator(),
                    payload = %record.payload_text(),
                    expected = %pattern,
                    "err"
                );
                Err(ExpectError::expectation_failed(pattern.to_string(), record))
            }
        }
    }

    /// Read access to the cursor state.
    #[must_use]
    pub const fn cursor(&self) -> &ExpectCursor {
        &self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::parse_spec;
    use logtap::Side;

    fn matcher(block: &str) -> Matcher {
        let patterns: Arc<[Pattern]> = parse_spec(block).unwrap().into();
        Matcher::new("l1", patterns)
    }

    fn rec(vxid: u32, tag: Tag) -> Record {
        Record::new(vxid, tag, Side::Client, "")
    }

    #[test]
    fn empty_pattern_list_is_complete_from_the_outset() {
        let m = matcher("");
        assert!(m.is_done());
    }

    #[test]
    fn wildcard_pattern_matches_anything() {
        let mut m = matcher("expect 0 * *");
        assert_eq!(m.feed(&rec(99, Tag::Debug)).unwrap(), Progress::Complete);
        assert!(m.is_done());
    }

    #[test]
    fn pseudo_records_are_invisible() {
        let mut m = matcher("expect 0 * ReqStart");
        assert_eq!(m.feed(&Record::batch_marker()).unwrap(), Progress::Ignored);
        assert_eq!(m.cursor().skip_count(), 0);
        assert_eq!(m.feed(&rec(1, Tag::ReqStart)).unwrap(), Progress::Complete);
    }

    #[test]
    fn back_reference_matches_previous_vxid() {
        let mut m = matcher("expect 0 * ReqStart\nexpect 0 = ReqEnd");
        assert_eq!(m.feed(&rec(5, Tag::ReqStart)).unwrap(), Progress::Matched);
        assert_eq!(m.feed(&rec(5, Tag::ReqEnd)).unwrap(), Progress::Complete);
    }

    #[test]
    fn back_reference_mismatch_fails() {
        let mut m = matcher("expect 0 * ReqStart\nexpect 0 = ReqEnd");
        assert_eq!(m.feed(&rec(5, Tag::ReqStart)).unwrap(), Progress::Matched);
        let err = m.feed(&rec(6, Tag::ReqEnd)).unwrap_err();
        assert!(err.is_expectation_failure());
    }

    #[test]
    fn skip_budget_tolerates_then_fails() {
        let mut m = matcher("expect 1 * Hit");
        assert_eq!(m.feed(&rec(1, Tag::Miss)).unwrap(), Progress::Skipped);
        let err = m.feed(&rec(1, Tag::Miss)).unwrap_err();
        assert!(matches!(
            err,
            ExpectError::ExpectationFailed { vxid: 1, tag: Tag::Miss, .. }
        ));
    }

    #[test]
    fn unlimited_skip_never_fails() {
        let mut m = matcher("expect * * Hit");
        for _ in 0..100 {
            assert_eq!(m.feed(&rec(1, Tag::Miss)).unwrap(), Progress::Skipped);
        }
        assert_eq!(m.feed(&rec(1, Tag::Hit)).unwrap(), Progress::Complete);
    }

    #[test]
    fn regex_applies_only_under_its_exact_tag() {
        let p = parse_spec("expect 0 * ReqURL \"^/api/\"").unwrap();
        let pattern = &p[0];
        let api = Record::new(1, Tag::ReqUrl, Side::Client, "/api/v1");
        let other = Record::new(1, Tag::ReqUrl, Side::Client, "/static/x");
        assert_eq!(classify(pattern, &api, None, None, 0), Classification::Match);
        assert_eq!(classify(pattern, &other, None, None, 0), Classification::Fail);

        // Under a wildcard tag matcher the regex is never consulted.
        let p = parse_spec("expect 0 * * \"^/api/\"").unwrap();
        assert_eq!(classify(&p[0], &other, None, None, 0), Classification::Match);
    }

    #[test]
    fn regex_is_not_consulted_for_a_different_tag() {
        let p = parse_spec("expect 1 * ReqURL \"^/api/\"").unwrap();
        let miss = Record::new(1, Tag::Miss, Side::Client, "/api/v1");
        // Wrong tag, so the non-match comes from the tag check and the
        // record is merely skipped.
        assert_eq!(classify(&p[0], &miss, None, None, 0), Classification::Skip);
    }

    #[test]
    fn regex_is_not_consulted_under_a_back_reference_tag() {
        let mut m = matcher("expect 0 * ReqStart\nexpect 0 = = \"nope\"");
        assert_eq!(m.feed(&rec(5, Tag::ReqStart)).unwrap(), Progress::Matched);
        // `=` repeats the matched tag; only an exact tag arms a regex.
        // The payload does not match, and must not be asked to.
        assert_eq!(m.feed(&rec(5, Tag::ReqStart)).unwrap(), Progress::Complete);
    }

    #[test]
    fn back_reference_before_any_match_never_matches() {
        let p = parse_spec("expect 0 = *").unwrap();
        let record = rec(7, Tag::Hit);
        assert_eq!(classify(&p[0], &record, None, None, 0), Classification::Fail);
    }

    #[test]
    fn match_resets_skip_count_for_the_next_pattern() {
        let mut m = matcher("expect 2 * ReqStart\nexpect 1 * ReqEnd");
        assert_eq!(m.feed(&rec(1, Tag::Debug)).unwrap(), Progress::Skipped);
        assert_eq!(m.feed(&rec(1, Tag::ReqStart)).unwrap(), Progress::Matched);
        assert_eq!(m.cursor().skip_count(), 0);
        assert_eq!(m.feed(&rec(1, Tag::Debug)).unwrap(), Progress::Skipped);
        assert_eq!(m.feed(&rec(1, Tag::ReqEnd)).unwrap(), Progress::Complete);
    }
}
