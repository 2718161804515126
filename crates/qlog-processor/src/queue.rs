// crates/qlog-processor/src/queue.rs
// ============================================================================
// Module: Bounded Transport Queue
// Description: In-process message queue with drop-oldest overflow.
// Purpose: Decouple producers from ingestion without ever blocking them.
// Dependencies: std, tracing
// ============================================================================

//! ## Overview
//! [`DropOldestQueue`] holds at most `capacity` messages. Pushing into a full
//! queue evicts the oldest message and counts it as dropped, so producers are
//! never stalled by a slow consumer. Consumers wait with a timeout so they can
//! observe a stop request while the queue is idle. A closed queue still hands
//! out its remaining messages before reporting [`Pop::Closed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::io;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

// ============================================================================
// SECTION: Queue
// ============================================================================

/// Outcome of a timed pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop<T> {
    /// Next message.
    Item(T),
    /// No message arrived within the timeout.
    Empty,
    /// The queue is closed and drained.
    Closed,
}

/// Queue contents guarded by the mutex.
struct QueueState<T> {
    /// Pending messages, oldest first.
    items: VecDeque<T>,
    /// No further pushes will arrive.
    closed: bool,
    /// Messages evicted on overflow.
    dropped: u64,
}

/// Bounded queue that evicts the oldest message on overflow.
///
/// # Invariants
/// - Never holds more than `capacity` messages.
/// - `push` never blocks on a full queue.
pub struct DropOldestQueue<T> {
    /// Maximum number of pending messages.
    capacity: usize,
    /// Guarded queue state.
    state: Mutex<QueueState<T>>,
    /// Signalled on push and close.
    ready: Condvar,
}

impl<T> DropOldestQueue<T> {
    /// Creates a queue holding at most `capacity` messages (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueues a message, evicting the oldest one when full.
    ///
    /// Returns true when a message was evicted. Pushes after `close` are ignored.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let mut evicted = false;
        while state.items.len() >= self.capacity {
            state.items.pop_front();
            state.dropped += 1;
            evicted = true;
        }
        state.items.push_back(item);
        drop(state);
        self.ready.notify_one();
        evicted
    }

    /// Waits up to `timeout` for the next message.
    pub fn pop_timeout(&self, timeout: Duration) -> Pop<T> {
        let state = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |state| state.items.is_empty() && !state.closed)
            .unwrap_or_else(PoisonError::into_inner);
        match state.items.pop_front() {
            Some(item) => Pop::Item(item),
            None if state.closed => Pop::Closed,
            None => Pop::Empty,
        }
    }

    /// Marks the queue closed and wakes every waiting consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    /// Returns the number of pending messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true when no message is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns the number of messages evicted on overflow.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Locks the queue state, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Line Reader
// ============================================================================

/// Feeds newline-delimited messages from `reader` into `queue` on a thread.
///
/// Blank lines are skipped and a trailing `\r` is stripped. The queue is
/// closed when the reader is exhausted or fails. The thread returns the number
/// of messages pushed.
pub fn spawn_line_reader<R>(
    mut reader: R,
    queue: Arc<DropOldestQueue<Vec<u8>>>,
) -> JoinHandle<io::Result<u64>>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let result = pump_lines(&mut reader, &queue);
        queue.close();
        result
    })
}

/// Reads lines until end of input, pushing each non-blank line.
fn pump_lines<R: BufRead>(reader: &mut R, queue: &DropOldestQueue<Vec<u8>>) -> io::Result<u64> {
    let mut pushed = 0_u64;
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(pushed);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if queue.push(line.clone()) {
            debug!(dropped = queue.dropped(), "transport queue full; dropped oldest message");
        }
        pushed += 1;
    }
}
