//! Expectation patterns and their compilation.
//!
//! A [`Pattern`] is one compiled `expect` line: a skip budget, a vxid
//! matcher, a tag matcher, and an optional payload regex. Patterns are
//! immutable once compiled; [`parse_spec`] turns a whole block of
//! `expect` lines into the ordered list an engine runs against.

use logtap::Tag;
use regex::bytes::Regex;

use crate::error::{ExpectError, Result};

/// Matcher for a single record field.
///
/// `Last` refers back to the value recorded by the most recent
/// successful match, so it can only succeed once something has matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected<T> {
    /// Matches any value.
    Any,
    /// Matches the value of the previously matched record.
    Last,
    /// Matches one specific value.
    Exact(T),
}

impl<T: Copy + Eq> Expected<T> {
    /// Whether `actual` satisfies this matcher given the last-matched
    /// value, if any.
    #[must_use]
    pub fn admits(self, actual: T, last: Option<T>) -> bool {
        match self {
            Self::Any => true,
            Self::Last => last == Some(actual),
            Self::Exact(expected) => expected == actual,
        }
    }
}

/// How many non-matching records a pattern tolerates before failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipLimit {
    /// Any number of records may be skipped.
    Unlimited,
    /// At most this many records may be skipped.
    Limit(u32),
}

impl SkipLimit {
    /// Whether one more record may be skipped after `count` skips.
    #[must_use]
    pub const fn allows(self, count: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limit(max) => count < max,
        }
    }
}

/// One compiled expectation.
#[derive(Debug, Clone)]
pub struct Pattern {
    skip: SkipLimit,
    vxid: Expected<u32>,
    tag: Expected<Tag>,
    regex: Option<Regex>,
    display: String,
}

impl Pattern {
    /// Compile the arguments of one `expect` line: skip, vxid, tag, and
    /// an optional payload regex.
    pub fn compile(tokens: &[&str]) -> Result<Self> {
        if tokens.len() < 3 || tokens.len() > 4 {
            return Err(ExpectError::syntax(format!(
                "expect takes 3 or 4 arguments, got {}",
                tokens.len()
            )));
        }

        let skip = match tokens[0] {
            "*" => SkipLimit::Unlimited,
            raw => SkipLimit::Limit(parse_uint(raw)?),
        };
        let vxid = match tokens[1] {
            "*" => Expected::Any,
            "=" => Expected::Last,
            raw => Expected::Exact(parse_uint(raw)?),
        };
        let tag = match tokens[2] {
            "*" => Expected::Any,
            "=" => Expected::Last,
            raw => Expected::Exact(
                Tag::from_name(raw).ok_or_else(|| ExpectError::unknown_tag(raw))?,
            ),
        };
        let regex = match tokens.get(3) {
            Some(raw) => Some(Regex::new(raw).map_err(|e| ExpectError::bad_regex(*raw, e))?),
            None => None,
        };

        let display = match tokens.get(3) {
            Some(raw) => format!("expect {} {} {} \"{raw}\"", tokens[0], tokens[1], tokens[2]),
            None => format!("expect {} {} {}", tokens[0], tokens[1], tokens[2]),
        };

        Ok(Self {
            skip,
            vxid,
            tag,
            regex,
            display,
        })
    }

    /// The skip budget.
    #[must_use]
    pub const fn skip(&self) -> SkipLimit {
        self.skip
    }

    /// The vxid matcher.
    #[must_use]
    pub const fn vxid(&self) -> Expected<u32> {
        self.vxid
    }

    /// The tag matcher.
    #[must_use]
    pub const fn tag(&self) -> Expected<Tag> {
        self.tag
    }

    /// The payload regex, if one was given.
    #[must_use]
    pub const fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

fn parse_uint(raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| ExpectError::syntax(format!("not a positive integer: '{raw}'")))
}

/// Compile a block of `expect` lines into an ordered pattern list.
///
/// Blank lines and lines starting with `#` are skipped. Lines are
/// whitespace-tokenized; double quotes group a token and backslash
/// escapes the next character inside quotes. An empty block compiles to
/// an empty list, which a run satisfies immediately.
pub fn parse_spec(block: &str) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = tokenize(line)?;
        let Some((command, rest)) = tokens.split_first() else {
            continue;
        };
        if command.as_str() != "expect" {
            return Err(ExpectError::syntax(format!("unknown command '{command}'")));
        }
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        patterns.push(Pattern::compile(&args)?);
    }
    Ok(patterns)
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            while let Some(inner) = chars.next() {
                match inner {
                    '"' => {
                        closed = true;
                        break;
                    }
                    // Only the quote and the backslash itself are
                    // escapable; other backslashes stay in the token so
                    // regex escapes like \d survive.
                    '\\' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => token.push(escaped),
                        Some(other) => {
                            token.push('\\');
                            token.push(other);
                        }
                        None => break,
                    },
                    other => token.push(other),
                }
            }
            if !closed {
                return Err(ExpectError::syntax(format!("unterminated quote in '{line}'")));
            }
        } else {
            while let Some(&bare) = chars.peek() {
                if bare.is_whitespace() {
                    break;
                }
                token.push(bare);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}
