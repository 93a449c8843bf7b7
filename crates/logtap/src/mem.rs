//! In-memory log instance.
//!
//! [`MemLog`] is a complete [`LogSource`] backed by a shared, append-only
//! transaction list. Harnesses feed it with [`MemLog::push`] while
//! consumers poll it through the normal cursor seam, which makes
//! deterministic tailing tests possible without a live system under
//! test. It is the reference implementation of the seam, not a toy: it
//! honors direction, grouping, query expressions, and record filters.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cursor::{CursorOpts, Direction, Grouping, LogCursor, LogHandle, LogSource};
use crate::error::{Result, SourceError};
use crate::query::Query;
use crate::record::{Batch, Record, Transaction};

#[derive(Debug, Default)]
struct MemState {
    transactions: Vec<Transaction>,
    closed: bool,
}

/// A shared in-memory log instance.
///
/// Cloning is cheap and every clone refers to the same underlying log,
/// so a harness can keep one handle for feeding while a registry owns
/// another.
#[derive(Debug, Clone)]
pub struct MemLog {
    name: String,
    state: Arc<Mutex<MemState>>,
}

impl MemLog {
    /// Create an empty instance with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MemState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        // State mutations are single pushes and flag flips, so a
        // poisoned lock still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one completed transaction. Live cursors will see it on
    /// their next poll.
    pub fn push(&self, txn: Transaction) {
        self.lock().transactions.push(txn);
    }

    /// Append several completed transactions in order.
    pub fn push_all(&self, txns: impl IntoIterator<Item = Transaction>) {
        self.lock().transactions.extend(txns);
    }

    /// Detach the instance: subsequent opens fail and live cursors
    /// report [`SourceError::Closed`] on their next poll.
    pub fn close(&self) {
        self.lock().closed = true;
        tracing::debug!(name = %self.name, "closed");
    }

    /// Number of transactions fed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().transactions.len()
    }

    /// Whether nothing has been fed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSource for MemLog {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn LogHandle>> {
        let state = self.lock();
        if state.closed {
            return Err(SourceError::closed(&self.name));
        }
        drop(state);
        tracing::debug!(name = %self.name, "open");
        Ok(Box::new(MemHandle {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// An open attachment to a [`MemLog`].
#[derive(Debug)]
struct MemHandle {
    name: String,
    state: Arc<Mutex<MemState>>,
}

impl MemHandle {
    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogHandle for MemHandle {
    fn cursor(&self, opts: &CursorOpts) -> Result<Box<dyn LogCursor>> {
        let query = opts
            .query
            .as_deref()
            .map(|expr| Query::compile(expr, opts.caseless))
            .transpose()?;

        let state = self.lock();
        if state.closed {
            return Err(SourceError::closed(&self.name));
        }
        let pos = match opts.direction {
            Direction::FromStart => 0,
            Direction::Tail => state.transactions.len(),
        };
        drop(state);

        tracing::debug!(
            name = %self.name,
            direction = ?opts.direction,
            grouping = %opts.grouping,
            query = ?opts.query,
            "cursor"
        );
        Ok(Box::new(MemCursor {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            pos,
            grouping: opts.grouping,
            query,
            filter: opts.filter.clone(),
        }))
    }
}

/// A polling cursor over a [`MemLog`].
struct MemCursor {
    name: String,
    state: Arc<Mutex<MemState>>,
    pos: usize,
    grouping: Grouping,
    query: Option<Query>,
    filter: crate::cursor::RecordFilter,
}

impl MemCursor {
    /// Expand one stored transaction into the transactions this cursor
    /// delivers for it under the configured grouping.
    fn deliver(&self, txn: &Transaction, out: &mut Batch) {
        let selected = match self.grouping {
            Grouping::Raw => {
                for rec in txn.records() {
                    if self.filter.admits(rec) {
                        out.push(Transaction::new(rec.vxid()).push(rec.clone()));
                    }
                }
                return;
            }
            // Stored transactions are already grouped by the feeder.
            Grouping::Session | Grouping::Request | Grouping::Vxid => txn,
        };

        let mut kept = Transaction::new(selected.vxid());
        for rec in selected.records() {
            if self.filter.admits(rec) {
                kept = kept.push(rec.clone());
            }
        }
        if !kept.records().is_empty() {
            out.push(kept);
        }
    }
}

impl LogCursor for MemCursor {
    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SourceError::closed(&self.name));
        }
        if self.pos >= state.transactions.len() {
            return Ok(None);
        }
        let fresh: Vec<Transaction> = state.transactions[self.pos..].to_vec();
        self.pos = state.transactions.len();
        drop(state);

        let mut batch = Batch::new();
        if self.grouping == Grouping::Raw {
            // The raw stream carries explicit flush delimiters.
            batch.push(Transaction::new(0).push(Record::batch_marker()));
        }
        for txn in &fresh {
            if let Some(query) = &self.query {
                if !query.matches(txn) {
                    continue;
                }
            }
            self.deliver(txn, &mut batch);
        }

        let all_pseudo = batch
            .iter()
            .all(|t| t.records().iter().all(|r| r.tag().is_pseudo()));
        if batch.is_empty() || all_pseudo {
            return Ok(None);
        }
        Ok(Some(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::RecordFilter;
    use crate::record::Side;
    use crate::tag::Tag;

    fn request_txn(vxid: u32, url: &str) -> Transaction {
        Transaction::new(vxid)
            .record(Tag::ReqStart, Side::Client, "")
            .record(Tag::ReqUrl, Side::Client, url.to_string())
            .record(Tag::ReqEnd, Side::Client, "")
    }

    fn open_cursor(log: &MemLog, opts: &CursorOpts) -> Box<dyn LogCursor> {
        log.open().unwrap().cursor(opts).unwrap()
    }

    #[test]
    fn tail_cursor_sees_only_new_transactions() {
        let log = MemLog::new("v1");
        log.push(request_txn(1, "/old"));

        let mut cursor = open_cursor(&log, &CursorOpts::default());
        assert!(cursor.next_batch().unwrap().is_none());

        log.push(request_txn(2, "/new"));
        let batch = cursor.next_batch().unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].vxid(), 2);
    }

    #[test]
    fn from_start_cursor_replays_history() {
        let log = MemLog::new("v1");
        log.push(request_txn(1, "/old"));

        let opts = CursorOpts {
            direction: Direction::FromStart,
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        let batch = cursor.next_batch().unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].vxid(), 1);
    }

    #[test]
    fn raw_grouping_explodes_and_delimits() {
        let log = MemLog::new("v1");
        log.push(request_txn(9, "/x"));

        let opts = CursorOpts {
            direction: Direction::FromStart,
            grouping: Grouping::Raw,
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        let batch = cursor.next_batch().unwrap().unwrap();
        // Delimiter first, then one singleton per record.
        assert_eq!(batch.len(), 4);
        assert!(batch[0].records()[0].tag().is_pseudo());
        assert!(batch[1..].iter().all(|t| t.records().len() == 1 && t.vxid() == 9));
    }

    #[test]
    fn query_filters_whole_transactions() {
        let log = MemLog::new("v1");
        log.push(request_txn(1, "/api/a"));
        log.push(request_txn(2, "/static/b"));

        let opts = CursorOpts {
            direction: Direction::FromStart,
            query: Some("ReqURL ~ ^/api/".to_string()),
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        let batch = cursor.next_batch().unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].vxid(), 1);
    }

    #[test]
    fn bad_query_fails_at_cursor_construction() {
        let log = MemLog::new("v1");
        let opts = CursorOpts {
            query: Some("Nonsense".to_string()),
            ..CursorOpts::default()
        };
        let err = log.open().unwrap().cursor(&opts).err().unwrap();
        assert!(err.to_string().contains("unknown tag"));
    }

    #[test]
    fn record_filter_drops_records_not_transactions() {
        let log = MemLog::new("v1");
        log.push(request_txn(3, "/a"));

        let opts = CursorOpts {
            direction: Direction::FromStart,
            filter: RecordFilter::default().include_tags([Tag::ReqUrl]),
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        let batch = cursor.next_batch().unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].records().len(), 1);
        assert_eq!(batch[0].records()[0].tag(), Tag::ReqUrl);
    }

    #[test]
    fn fully_filtered_poll_reports_nothing_new() {
        let log = MemLog::new("v1");
        log.push(request_txn(3, "/a"));

        let opts = CursorOpts {
            direction: Direction::FromStart,
            filter: RecordFilter::default().include_tags([Tag::Hit]),
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        assert!(cursor.next_batch().unwrap().is_none());
        // The poll still consumed the data.
        assert!(cursor.next_batch().unwrap().is_none());
    }

    #[test]
    fn close_fails_open_and_live_cursors() {
        let log = MemLog::new("v1");
        let mut cursor = open_cursor(&log, &CursorOpts::default());
        log.close();

        assert!(log.open().err().unwrap().is_closed());
        assert!(cursor.next_batch().unwrap_err().is_closed());
    }

    #[test]
    fn clones_share_the_same_log() {
        let log = MemLog::new("v1");
        let feeder = log.clone();
        let opts = CursorOpts {
            direction: Direction::FromStart,
            ..CursorOpts::default()
        };
        let mut cursor = open_cursor(&log, &opts);
        feeder.push(request_txn(1, "/shared"));
        assert!(cursor.next_batch().unwrap().is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Pushes arriving in bursts between polls.
        fn arb_vxid_bursts() -> impl Strategy<Value = Vec<Vec<u32>>> {
            prop::collection::vec(prop::collection::vec(1u32..100, 0..4), 1..6)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// However pushes interleave with polls, a from-start
            /// cursor delivers every transaction exactly once, in push
            /// order.
            #[test]
            fn polling_preserves_push_order(bursts in arb_vxid_bursts()) {
                let log = MemLog::new("v1");
                let opts = CursorOpts {
                    direction: Direction::FromStart,
                    ..CursorOpts::default()
                };
                let mut cursor = open_cursor(&log, &opts);

                let mut seen = Vec::new();
                for burst in &bursts {
                    for &vxid in burst {
                        log.push(request_txn(vxid, "/p"));
                    }
                    while let Some(batch) = cursor.next_batch().unwrap() {
                        seen.extend(batch.iter().map(Transaction::vxid));
                    }
                }
                prop_assert_eq!(seen, bursts.concat());
            }
        }
    }
}
