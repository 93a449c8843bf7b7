//! Records, transactions, and batches.
//!
//! A [`Record`] is one structured log entry: a transaction identifier
//! (vxid), a [`Tag`], a [`Side`] classification, and a payload of bytes
//! with a declared length. A [`Transaction`] is an ordered group of
//! records sharing a grouping key, and a [`Batch`] is what a cursor hands
//! out per poll: the transactions that became complete since the last
//! poll, in source order.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// Which half of the proxied conversation a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Client-facing activity.
    Client,
    /// Backend-facing activity.
    Backend,
    /// Not attributable to either side (timers, internals, pseudo-records).
    Neither,
}

impl Side {
    /// One-character marker used in diagnostics: `c`, `b`, or `-`.
    #[must_use]
    pub const fn indicator(self) -> char {
        match self {
            Self::Client => 'c',
            Self::Backend => 'b',
            Self::Neither => '-',
        }
    }
}

/// One structured, tagged log entry.
///
/// Records are immutable once emitted; the engine only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    vxid: u32,
    tag: Tag,
    side: Side,
    #[serde(with = "payload_text")]
    payload: Bytes,
}

impl Record {
    /// Create a record. The payload's declared length is the length of
    /// the buffer handed in.
    pub fn new(vxid: u32, tag: Tag, side: Side, payload: impl Into<Bytes>) -> Self {
        Self {
            vxid,
            tag,
            side,
            payload: payload.into(),
        }
    }

    /// Create the batch-delimiter pseudo-record.
    #[must_use]
    pub fn batch_marker() -> Self {
        Self::new(0, Tag::Batch, Side::Neither, Bytes::new())
    }

    /// The transaction identifier correlating this record with others.
    #[must_use]
    pub const fn vxid(&self) -> u32 {
        self.vxid
    }

    /// The event-type classifier.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Which side of the conversation emitted this record.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// The payload bytes, up to the declared length.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload rendered as text for diagnostics. Invalid UTF-8 is
    /// replaced, never an error.
    #[must_use]
    pub fn payload_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// An ordered group of records sharing a grouping key.
///
/// Depending on the source's grouping mode the records inside one
/// transaction may carry differing vxids (e.g. a session transaction
/// containing all its requests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    vxid: u32,
    records: Vec<Record>,
}

impl Transaction {
    /// Create an empty transaction with the given grouping key.
    #[must_use]
    pub const fn new(vxid: u32) -> Self {
        Self {
            vxid,
            records: Vec::new(),
        }
    }

    /// Append a record emitted by this transaction, builder style.
    #[must_use]
    pub fn record(mut self, tag: Tag, side: Side, payload: impl Into<Bytes>) -> Self {
        self.records.push(Record::new(self.vxid, tag, side, payload));
        self
    }

    /// Append an already-built record, keeping its own vxid.
    #[must_use]
    pub fn push(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// The grouping key.
    #[must_use]
    pub const fn vxid(&self) -> u32 {
        self.vxid
    }

    /// The records of this transaction, in emission order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Whether any record in this transaction carries `tag`.
    #[must_use]
    pub fn contains_tag(&self, tag: Tag) -> bool {
        self.records.iter().any(|r| r.tag() == tag)
    }
}

/// The transactions one cursor poll hands out, in source order.
pub type Batch = Vec<Transaction>;

/// Serialize payloads as text so canned streams stay human-editable.
mod payload_text {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Bytes::from(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_indicators() {
        assert_eq!(Side::Client.indicator(), 'c');
        assert_eq!(Side::Backend.indicator(), 'b');
        assert_eq!(Side::Neither.indicator(), '-');
    }

    #[test]
    fn record_accessors() {
        let rec = Record::new(1001, Tag::ReqUrl, Side::Client, "/api/v1");
        assert_eq!(rec.vxid(), 1001);
        assert_eq!(rec.tag(), Tag::ReqUrl);
        assert_eq!(rec.side(), Side::Client);
        assert_eq!(rec.payload().as_ref(), b"/api/v1");
        assert_eq!(rec.payload_text(), "/api/v1");
    }

    #[test]
    fn batch_marker_is_pseudo() {
        let marker = Record::batch_marker();
        assert!(marker.tag().is_pseudo());
        assert!(marker.payload().is_empty());
    }

    #[test]
    fn transaction_builder_inherits_vxid() {
        let txn = Transaction::new(7)
            .record(Tag::ReqStart, Side::Client, "start")
            .record(Tag::ReqEnd, Side::Client, "end");
        assert_eq!(txn.vxid(), 7);
        assert_eq!(txn.records().len(), 2);
        assert!(txn.records().iter().all(|r| r.vxid() == 7));
        assert!(txn.contains_tag(Tag::ReqEnd));
        assert!(!txn.contains_tag(Tag::Hit));
    }

    #[test]
    fn push_keeps_foreign_vxid() {
        let txn = Transaction::new(10).push(Record::new(11, Tag::Begin, Side::Client, "req"));
        assert_eq!(txn.records()[0].vxid(), 11);
    }

    #[test]
    fn transaction_serde_round_trip() {
        let txn = Transaction::new(42).record(Tag::ReqUrl, Side::Client, "/index.html");
        let json = serde_json::to_string(&txn).unwrap();
        assert!(json.contains("\"ReqURL\""));
        assert!(json.contains("/index.html"));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txn);
    }
}
