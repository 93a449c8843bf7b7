//! The batch dispatch loop.
//!
//! A [`Runner`] owns everything the background run needs: the source
//! attachment, the log cursor, the compiled patterns, and the
//! cancellation token. It polls the cursor for batches, feeds every
//! record through the [`Matcher`] in stream order, and sleeps briefly
//! when a tailing poll comes back empty.

use std::sync::Arc;
use std::time::Duration;

use logtap::{Batch, LogCursor, LogHandle};
use tokio_util::sync::CancellationToken;

use crate::error::ExpectError;
use crate::matcher::{Matcher, Progress};
use crate::pattern::Pattern;

/// How long an idle tailing poll waits before retrying.
const IDLE_WAIT: Duration = Duration::from_millis(10);

/// Verdict of one dispatched batch.
#[derive(Debug)]
pub(crate) enum Dispatch {
    /// Batch exhausted with the run still open.
    Continue,
    /// The final pattern matched. Remaining records of the batch are
    /// deliberately left unevaluated.
    Success,
    /// A record fell outside its pattern's skip budget.
    Failure(ExpectError),
}

/// Terminal outcome of a background run.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    /// Every pattern was satisfied.
    Success,
    /// The run hit a match failure or a source failure.
    Failed(ExpectError),
    /// The run was cancelled before reaching a verdict.
    Cancelled,
}

/// Feed one batch through the matcher, transaction by transaction,
/// record by record, in source order.
pub(crate) fn dispatch_batch(matcher: &mut Matcher, batch: &Batch) -> Dispatch {
    for txn in batch {
        for record in txn.records() {
            match matcher.feed(record) {
                Ok(Progress::Complete) => return Dispatch::Success,
                Ok(Progress::Ignored | Progress::Skipped | Progress::Matched) => {}
                Err(err) => return Dispatch::Failure(err),
            }
        }
    }
    Dispatch::Continue
}

/// The state owned by one background run.
pub(crate) struct Runner {
    name: String,
    patterns: Arc<[Pattern]>,
    query: Option<String>,
    cursor: Box<dyn LogCursor>,
    cancel: CancellationToken,
    // Held for the duration of the run; dropping it releases the
    // source attachment.
    _handle: Box<dyn LogHandle>,
}

impl Runner {
    pub(crate) fn new(
        name: String,
        patterns: Arc<[Pattern]>,
        query: Option<String>,
        handle: Box<dyn LogHandle>,
        cursor: Box<dyn LogCursor>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            patterns,
            query,
            cursor,
            cancel,
            _handle: handle,
        }
    }

    /// Drive the run to success, failure, or cancellation.
    pub(crate) async fn run(mut self) -> RunOutcome {
        tracing::debug!(name = %self.name, "begin");
        if let Some(query) = &self.query {
            tracing::debug!(name = %self.name, query = %query, "query");
        }

        let mut matcher = Matcher::new(self.name.clone(), Arc::clone(&self.patterns));
        while !matcher.is_done() {
            if self.cancel.is_cancelled() {
                tracing::debug!(name = %self.name, "cancelled");
                return RunOutcome::Cancelled;
            }
            match self.cursor.next_batch() {
                Err(err) => {
                    tracing::error!(name = %self.name, error = %err, "dispatch failed");
                    return RunOutcome::Failed(err.into());
                }
                Ok(Some(batch)) => match dispatch_batch(&mut matcher, &batch) {
                    Dispatch::Continue => {}
                    Dispatch::Success => break,
                    Dispatch::Failure(err) => return RunOutcome::Failed(err),
                },
                Ok(None) => {
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::debug!(name = %self.name, "cancelled");
                            return RunOutcome::Cancelled;
                        }
                        () = tokio::time::sleep(IDLE_WAIT) => {}
                    }
                }
            }
        }

        tracing::debug!(name = %self.name, "end");
        RunOutcome::Success
    }
}
