//! Transaction-level query expressions.
//!
//! A cursor can be restricted to transactions matching a small textual
//! expression: `<TagName>` keeps transactions containing that tag, and
//! `<TagName> ~ <regex>` additionally requires some record with that tag
//! to have a payload matching the regex. The full query language of a
//! production log subsystem is deliberately out of scope; this is the
//! slice test harnesses use.

use regex::bytes::{Regex, RegexBuilder};

use crate::error::{Result, SourceError};
use crate::record::Transaction;
use crate::tag::Tag;

/// A compiled query expression.
#[derive(Debug, Clone)]
pub struct Query {
    tag: Tag,
    regex: Option<Regex>,
}

impl Query {
    /// Compile `expr`, optionally making the regex case-insensitive.
    ///
    /// Unknown tag names and malformed regexes are reported as
    /// [`SourceError::Query`].
    pub fn compile(expr: &str, caseless: bool) -> Result<Self> {
        let (tag_part, regex_part) = match expr.split_once('~') {
            Some((lhs, rhs)) => (lhs, Some(rhs)),
            None => (expr, None),
        };

        let tag_name = tag_part.trim();
        let tag = Tag::from_name(tag_name)
            .ok_or_else(|| SourceError::query(format!("unknown tag '{tag_name}'")))?;

        let regex = match regex_part {
            Some(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(SourceError::query("missing regex after '~'"));
                }
                let compiled = RegexBuilder::new(raw)
                    .case_insensitive(caseless)
                    .build()
                    .map_err(|e| SourceError::query(format!("bad regex '{raw}': {e}")))?;
                Some(compiled)
            }
            None => None,
        };

        Ok(Self { tag, regex })
    }

    /// Whether `txn` satisfies this expression.
    #[must_use]
    pub fn matches(&self, txn: &Transaction) -> bool {
        match &self.regex {
            None => txn.contains_tag(self.tag),
            Some(re) => txn
                .records()
                .iter()
                .any(|rec| rec.tag() == self.tag && re.is_match(rec.payload())),
        }
    }
}
