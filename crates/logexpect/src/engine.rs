//! Engine lifecycle.
//!
//! A [`LogExpect`] engine holds the compiled expectation list, the log
//! source reference, and the cursor configuration, and controls the one
//! background task that runs the dispatch loop. Starting is
//! non-blocking; the verdict surfaces at [`LogExpect::wait`]. Any
//! mutation of a running engine first waits for the run in flight, so
//! configuration and dispatch never overlap.

use std::sync::Arc;

use logtap::{CursorOpts, Direction, Grouping, LogSource, RecordFilter, Side, Tag};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{RunOutcome, Runner};
use crate::error::{ExpectError, Result};
use crate::pattern::{Pattern, parse_spec};

struct RunningTask {
    task: JoinHandle<RunOutcome>,
    cancel: CancellationToken,
}

/// A named log-expectation engine.
pub struct LogExpect {
    name: String,
    patterns: Arc<[Pattern]>,
    source: Option<Arc<dyn LogSource>>,
    grouping: Grouping,
    direction: Direction,
    query: Option<String>,
    filter: RecordFilter,
    caseless: bool,
    running: Option<RunningTask>,
}

impl LogExpect {
    /// Create an idle engine with an empty expectation list, vxid
    /// grouping, and a tailing cursor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new().into(),
            source: None,
            grouping: Grouping::default(),
            direction: Direction::default(),
            query: None,
            filter: RecordFilter::default(),
            caseless: false,
            running: None,
        }
    }

    /// The engine's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a background run is in flight.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The compiled expectation list, in match order.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The configured grouping mode.
    #[must_use]
    pub const fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// The configured read direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    async fn implicit_wait(&mut self) -> Result<()> {
        if self.is_running() {
            self.wait().await
        } else {
            Ok(())
        }
    }

    /// Point the engine at a log source.
    pub async fn set_source(&mut self, source: Arc<dyn LogSource>) -> Result<()> {
        self.implicit_wait().await?;
        self.source = Some(source);
        Ok(())
    }

    /// Set how the cursor groups records into transactions.
    pub async fn set_grouping(&mut self, grouping: Grouping) -> Result<()> {
        self.implicit_wait().await?;
        self.grouping = grouping;
        Ok(())
    }

    /// Set where the cursor starts reading.
    pub async fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.implicit_wait().await?;
        self.direction = direction;
        Ok(())
    }

    /// Set the transaction-level query expression.
    pub async fn set_query(&mut self, query: impl Into<String>) -> Result<()> {
        self.implicit_wait().await?;
        self.query = Some(query.into());
        Ok(())
    }

    /// Restrict the cursor to records from one side of the
    /// conversation.
    pub async fn set_side(&mut self, side: Side) -> Result<()> {
        self.implicit_wait().await?;
        self.filter = std::mem::take(&mut self.filter).side(side);
        Ok(())
    }

    /// Restrict the cursor to records carrying one of the given tags.
    pub async fn include_tags(&mut self, tags: impl IntoIterator<Item = Tag>) -> Result<()> {
        self.implicit_wait().await?;
        self.filter = std::mem::take(&mut self.filter).include_tags(tags);
        Ok(())
    }

    /// Compile source-side query regexes case-insensitively.
    pub async fn set_caseless(&mut self, caseless: bool) -> Result<()> {
        self.implicit_wait().await?;
        self.caseless = caseless;
        Ok(())
    }

    /// Replace the expectation list by compiling a block of `expect`
    /// lines.
    pub async fn spec(&mut self, block: &str) -> Result<()> {
        self.implicit_wait().await?;
        // The old list is discarded even when the new block fails to
        // compile.
        self.patterns = Vec::new().into();
        self.patterns = parse_spec(block)?.into();
        Ok(())
    }

    /// Start the background run without blocking on it.
    ///
    /// Requires a log source. Opening the source and constructing the
    /// cursor happen here, so source and query problems surface
    /// synchronously.
    pub async fn start(&mut self) -> Result<()> {
        self.implicit_wait().await?;
        let source = self.source.clone().ok_or_else(|| {
            ExpectError::config(format!("logexpect '{}' has no log source", self.name))
        })?;
        let handle = source.open()?;
        let opts = CursorOpts {
            direction: self.direction,
            grouping: self.grouping,
            query: self.query.clone(),
            filter: self.filter.clone(),
            caseless: self.caseless,
        };
        let cursor = handle.cursor(&opts)?;
        let cancel = CancellationToken::new();
        let runner = Runner::new(
            self.name.clone(),
            Arc::clone(&self.patterns),
            self.query.clone(),
            handle,
            cursor,
            cancel.clone(),
        );
        let task = tokio::spawn(runner.run());
        self.running = Some(RunningTask { task, cancel });
        Ok(())
    }

    /// Block until the background run finishes and report its verdict.
    ///
    /// Errors with [`ExpectError::NotStarted`] when no run is in
    /// flight. A panic inside the background task is resumed here.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Err(ExpectError::not_started(&self.name));
        };
        tracing::debug!(name = %self.name, "waiting");
        let outcome = match running.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => RunOutcome::Cancelled,
        };
        match outcome {
            RunOutcome::Success => Ok(()),
            RunOutcome::Failed(err) => Err(err),
            RunOutcome::Cancelled => Err(ExpectError::cancelled(&self.name)),
        }
    }

    /// Start and immediately wait for the verdict.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        self.wait().await
    }

    /// Ask a running background task to stop at its next cancellation
    /// point. Does not block; the outcome surfaces at
    /// [`LogExpect::wait`].
    pub fn cancel(&self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }

    /// Cancel and reap any background run, discarding its outcome.
    ///
    /// This is the teardown path: failures and cancellations are
    /// logged, not raised.
    pub async fn shutdown(&mut self) {
        if self.running.is_none() {
            return;
        }
        self.cancel();
        if let Err(err) = self.wait().await {
            tracing::error!(name = %self.name, error = %err, "run discarded at teardown");
        }
    }
}

impl Drop for LogExpect {
    fn drop(&mut self) {
        // A dropped engine must not leave its task polling forever.
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for LogExpect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogExpect")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .field("grouping", &self.grouping)
            .field("direction", &self.direction)
            .field("query", &self.query)
            .field("running", &self.running.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap::{Batch, LogCursor, LogHandle, MemLog, Transaction};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn wait_without_start_is_an_error() {
        let mut engine = LogExpect::new("l1");
        let err = engine.wait().await.unwrap_err();
        assert!(matches!(err, ExpectError::NotStarted { .. }));
    }

    #[tokio::test]
    async fn start_without_source_is_an_error() {
        let mut engine = LogExpect::new("l1");
        let err = engine.start().await.unwrap_err();
        assert!(err.is_config());
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn empty_expectation_list_succeeds_immediately() {
        let log = MemLog::new("v1");
        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(log)).await.unwrap();
        engine.run().await.unwrap();
    }

    #[tokio::test]
    async fn spec_discards_old_patterns_even_on_error() {
        let mut engine = LogExpect::new("l1");
        engine.spec("expect 0 * ReqStart").await.unwrap();
        assert_eq!(engine.patterns().len(), 1);
        assert!(engine.spec("nonsense 1 2 3").await.is_err());
        assert!(engine.patterns().is_empty());
    }

    #[tokio::test]
    async fn reconfiguring_a_finished_run_implicitly_waits() {
        let log = MemLog::new("v1");
        log.push(Transaction::new(1).record(logtap::Tag::Hit, logtap::Side::Client, ""));

        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(log)).await.unwrap();
        engine.spec("expect 0 * Hit").await.unwrap();
        engine.set_direction(Direction::FromStart).await.unwrap();
        engine.start().await.unwrap();
        assert!(engine.is_running());
        // The run satisfies itself from history; the setter reaps it.
        engine.set_grouping(Grouping::Raw).await.unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn cancel_then_wait_reports_cancellation() {
        let log = MemLog::new("v1");
        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(log)).await.unwrap();
        engine.spec("expect 0 * Hit").await.unwrap();
        engine.start().await.unwrap();
        engine.cancel();
        let err = engine.wait().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_swallows_the_cancellation() {
        let log = MemLog::new("v1");
        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(log)).await.unwrap();
        engine.spec("expect 0 * Hit").await.unwrap();
        engine.start().await.unwrap();
        engine.shutdown().await;
        assert!(!engine.is_running());
    }

    /// A [`MemLog`] whose handles carry a channel sender, so a test can
    /// observe the moment the background task lets go of the source.
    struct TetheredSource {
        log: MemLog,
        tether: mpsc::UnboundedSender<()>,
    }

    impl LogSource for TetheredSource {
        fn name(&self) -> &str {
            self.log.name()
        }

        fn open(&self) -> logtap::Result<Box<dyn LogHandle>> {
            Ok(Box::new(TetheredHandle {
                inner: self.log.open()?,
                _tether: self.tether.clone(),
            }))
        }
    }

    struct TetheredHandle {
        inner: Box<dyn LogHandle>,
        _tether: mpsc::UnboundedSender<()>,
    }

    impl LogHandle for TetheredHandle {
        fn cursor(&self, opts: &CursorOpts) -> logtap::Result<Box<dyn LogCursor>> {
            self.inner.cursor(opts)
        }
    }

    #[tokio::test]
    async fn dropping_a_running_engine_cancels_its_task() {
        let (tether, mut released) = mpsc::unbounded_channel();
        let source = TetheredSource { log: MemLog::new("v1"), tether };
        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(source)).await.unwrap();
        engine.spec("expect * * Hit").await.unwrap();
        engine.start().await.unwrap();

        drop(engine);
        // The task owns the last live sender. Without the cancellation
        // in Drop it would idle forever and recv would never return.
        assert!(released.recv().await.is_none());
    }

    struct PanicSource;

    impl LogSource for PanicSource {
        fn name(&self) -> &str {
            "v1"
        }

        fn open(&self) -> logtap::Result<Box<dyn LogHandle>> {
            Ok(Box::new(Self))
        }
    }

    impl LogHandle for PanicSource {
        fn cursor(&self, _opts: &CursorOpts) -> logtap::Result<Box<dyn LogCursor>> {
            Ok(Box::new(Self))
        }
    }

    impl LogCursor for PanicSource {
        fn next_batch(&mut self) -> logtap::Result<Option<Batch>> {
            panic!("cursor blew up");
        }
    }

    #[tokio::test]
    #[should_panic(expected = "cursor blew up")]
    async fn wait_resumes_a_panicking_run() {
        let mut engine = LogExpect::new("l1");
        engine.set_source(Arc::new(PanicSource)).await.unwrap();
        engine.spec("expect 0 * Hit").await.unwrap();
        engine.start().await.unwrap();
        let _ = engine.wait().await;
    }
}
