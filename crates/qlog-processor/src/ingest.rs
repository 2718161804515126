// crates/qlog-processor/src/ingest.rs
// ============================================================================
// Module: Ingestion Loop
// Description: Cooperative single-consumer loop over the transport queue.
// Purpose: Process records one at a time until stopped, exhausted or broken.
// Dependencies: std, thiserror, tracing
// ============================================================================

//! ## Overview
//! The loop has two states. It starts [`IngestState::Running`] and checks
//! the shutdown signal once at the top of every iteration; a raised signal
//! moves it to [`IngestState::Stopping`], which is terminal. A record already
//! pulled from the queue always runs to completion. Discardable failures are
//! logged and counted; a fatal failure ends the loop with an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::process::Disposition;
use crate::process::ProcessError;
use crate::process::RecordProcessor;
use crate::queue::DropOldestQueue;
use crate::queue::Pop;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Ingestion loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    /// Pulling and processing records.
    Running,
    /// Stop requested; no further records are pulled.
    Stopping,
}

/// Shared stop request flag.
///
/// Clones observe the same flag, so one clone can be handed to a signal
/// handler while the loop holds another.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    /// Raised once a stop has been requested.
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Creates an unraised signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the loop to stop after the in-flight record.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Summary and Errors
// ============================================================================

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records persisted successfully.
    pub processed: u64,
    /// Records discarded after a non-fatal failure.
    pub discarded: u64,
    /// Log rows written.
    pub entries_written: u64,
    /// Messages evicted by the transport queue.
    pub dropped: u64,
}

/// Ingestion loop failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// A record failed in a way that must stop the process.
    #[error("fatal record failure after {} processed records: {source}", .summary.processed)]
    Fatal {
        /// Counters up to the failure.
        summary: IngestSummary,
        /// The fatal failure.
        source: ProcessError,
    },
}

// ============================================================================
// SECTION: Loop
// ============================================================================

/// Single-consumer ingestion loop.
///
/// # Invariants
/// - The stop signal is checked at exactly one point per iteration.
/// - `Stopping` is never left once entered.
pub struct IngestLoop {
    /// Per-record pipeline.
    processor: RecordProcessor,
    /// Transport queue.
    queue: Arc<DropOldestQueue<Vec<u8>>>,
    /// Stop request flag.
    shutdown: ShutdownSignal,
    /// Queue wait per iteration.
    poll_interval: Duration,
    /// Current state.
    state: IngestState,
    /// Running counters.
    summary: IngestSummary,
}

impl IngestLoop {
    /// Creates a loop in the `Running` state.
    #[must_use]
    pub fn new(
        processor: RecordProcessor,
        queue: Arc<DropOldestQueue<Vec<u8>>>,
        shutdown: ShutdownSignal,
        poll_interval: Duration,
    ) -> Self {
        Self {
            processor,
            queue,
            shutdown,
            poll_interval,
            state: IngestState::Running,
            summary: IngestSummary::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> IngestState {
        self.state
    }

    /// Runs until stopped, until the queue is closed and drained, or until a
    /// record fails fatally.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Fatal`] on a fatal record failure.
    pub fn run(&mut self) -> Result<IngestSummary, IngestError> {
        while self.state == IngestState::Running {
            if self.shutdown.is_requested() {
                self.state = IngestState::Stopping;
                info!("stop requested; ingestion stopping");
                break;
            }
            match self.queue.pop_timeout(self.poll_interval) {
                Pop::Item(body) => self.handle(&body)?,
                Pop::Empty => {}
                Pop::Closed => {
                    info!("transport exhausted; ingestion finished");
                    break;
                }
            }
        }
        self.summary.dropped = self.queue.dropped();
        Ok(self.summary)
    }

    /// Processes one message and updates the counters.
    fn handle(&mut self, body: &[u8]) -> Result<(), IngestError> {
        match self.processor.process(body) {
            Ok(outcome) => {
                self.summary.processed += 1;
                self.summary.entries_written +=
                    u64::try_from(outcome.row_ids.len()).unwrap_or(u64::MAX);
                info!(
                    dataset = %outcome.dataset,
                    entries = outcome.row_ids.len(),
                    fees = %outcome.fees,
                    "record persisted"
                );
                Ok(())
            }
            Err(err) => match err.disposition() {
                Disposition::Discard => {
                    self.summary.discarded += 1;
                    warn!(kind = err.kind(), error = %err, "record discarded");
                    Ok(())
                }
                Disposition::Fatal => {
                    error!(kind = err.kind(), error = %err, "fatal record failure");
                    self.summary.dropped = self.queue.dropped();
                    Err(IngestError::Fatal {
                        summary: self.summary,
                        source: err,
                    })
                }
            },
        }
    }
}
