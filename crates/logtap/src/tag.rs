//! The closed record-tag vocabulary.
//!
//! Every log record carries exactly one [`Tag`] drawn from this fixed,
//! source-defined enumeration. Tags classify the event a record describes
//! (session, request, response, cache, backend, timing). The vocabulary
//! also contains one pseudo-tag, [`Tag::Batch`], which delimits flushed
//! batches in the raw stream and never describes a real event.

use serde::{Deserialize, Serialize};

/// Event-type classifier for a log record.
///
/// The set is closed: sources may only emit these tags, and matchers
/// resolve textual tag names against this enumeration via
/// [`Tag::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Transaction group opened.
    Begin,
    /// Transaction group closed.
    End,
    /// Client session accepted.
    SessOpen,
    /// Client session closed.
    SessClose,
    /// Client request processing started.
    ReqStart,
    /// Client request method.
    ReqMethod,
    /// Client request URL.
    #[serde(rename = "ReqURL")]
    ReqUrl,
    /// Client request protocol version.
    ReqProtocol,
    /// Client request header.
    ReqHeader,
    /// Client request body chunk.
    ReqBody,
    /// Client request accounting totals.
    ReqAcct,
    /// Client request processing finished.
    ReqEnd,
    /// Response protocol version.
    RespProtocol,
    /// Response status code.
    RespStatus,
    /// Response reason phrase.
    RespReason,
    /// Response header.
    RespHeader,
    /// Cache hit.
    Hit,
    /// Cache miss.
    Miss,
    /// Hit on a pass object.
    HitPass,
    /// Hit turned into a miss.
    HitMiss,
    /// Object lifetime decision.
    #[serde(rename = "TTL")]
    Ttl,
    /// Backend connection opened.
    BackendOpen,
    /// Backend connection closed.
    BackendClose,
    /// Backend request method.
    BereqMethod,
    /// Backend request URL.
    #[serde(rename = "BereqURL")]
    BereqUrl,
    /// Backend request header.
    BereqHeader,
    /// Backend response status code.
    BerespStatus,
    /// Backend response header.
    BerespHeader,
    /// Backend fetch failed.
    FetchError,
    /// Timing checkpoint.
    Timestamp,
    /// Payload length accounting.
    Length,
    /// Diagnostic chatter.
    Debug,
    /// Error report.
    Error,
    /// Batch delimiter pseudo-record; never a real event.
    #[serde(rename = "__Batch")]
    Batch,
}

impl Tag {
    /// Every tag in the vocabulary, in declaration order.
    pub const ALL: [Self; 34] = [
        Self::Begin,
        Self::End,
        Self::SessOpen,
        Self::SessClose,
        Self::ReqStart,
        Self::ReqMethod,
        Self::ReqUrl,
        Self::ReqProtocol,
        Self::ReqHeader,
        Self::ReqBody,
        Self::ReqAcct,
        Self::ReqEnd,
        Self::RespProtocol,
        Self::RespStatus,
        Self::RespReason,
        Self::RespHeader,
        Self::Hit,
        Self::Miss,
        Self::HitPass,
        Self::HitMiss,
        Self::Ttl,
        Self::BackendOpen,
        Self::BackendClose,
        Self::BereqMethod,
        Self::BereqUrl,
        Self::BereqHeader,
        Self::BerespStatus,
        Self::BerespHeader,
        Self::FetchError,
        Self::Timestamp,
        Self::Length,
        Self::Debug,
        Self::Error,
        Self::Batch,
    ];

    /// The canonical name of this tag as it appears in directives,
    /// queries, and serialized streams.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Begin => "Begin",
            Self::End => "End",
            Self::SessOpen => "SessOpen",
            Self::SessClose => "SessClose",
            Self::ReqStart => "ReqStart",
            Self::ReqMethod => "ReqMethod",
            Self::ReqUrl => "ReqURL",
            Self::ReqProtocol => "ReqProtocol",
            Self::ReqHeader => "ReqHeader",
            Self::ReqBody => "ReqBody",
            Self::ReqAcct => "ReqAcct",
            Self::ReqEnd => "ReqEnd",
            Self::RespProtocol => "RespProtocol",
            Self::RespStatus => "RespStatus",
            Self::RespReason => "RespReason",
            Self::RespHeader => "RespHeader",
            Self::Hit => "Hit",
            Self::Miss => "Miss",
            Self::HitPass => "HitPass",
            Self::HitMiss => "HitMiss",
            Self::Ttl => "TTL",
            Self::BackendOpen => "BackendOpen",
            Self::BackendClose => "BackendClose",
            Self::BereqMethod => "BereqMethod",
            Self::BereqUrl => "BereqURL",
            Self::BereqHeader => "BereqHeader",
            Self::BerespStatus => "BerespStatus",
            Self::BerespHeader => "BerespHeader",
            Self::FetchError => "FetchError",
            Self::Timestamp => "Timestamp",
            Self::Length => "Length",
            Self::Debug => "Debug",
            Self::Error => "Error",
            Self::Batch => "__Batch",
        }
    }

    /// Resolve a textual tag name, ignoring ASCII case.
    ///
    /// Returns `None` for names outside the vocabulary. The pseudo-tag
    /// resolves like any other so that filters can name it explicitly.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.name().eq_ignore_ascii_case(name))
    }

    /// Whether this tag marks a synthetic delimiter record rather than a
    /// real logged event.
    ///
    /// Pseudo-records are invisible to expectation matching: they are
    /// neither matched, skipped, nor counted.
    #[must_use]
    pub const fn is_pseudo(self) -> bool {
        matches!(self, Self::Batch)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
