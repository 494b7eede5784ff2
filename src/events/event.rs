//! # Runtime events emitted by the queue and its sequences.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Queue events**: arbitration loop lifecycle (started, stop requested, stopped)
//! - **Sequence events**: per-key actor lifecycle (created, drained, removed, terminated)
//! - **Job events**: submission outcome and execution (enqueued, rejected, starting, completed, panicked)
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, sequence key,
//! priority and backlog length.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use keyqueue::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::JobEnqueued)
//!     .with_key("match-1")
//!     .with_priority(2)
//!     .with_pending(3);
//!
//! assert_eq!(ev.kind, EventKind::JobEnqueued);
//! assert_eq!(ev.key.as_deref(), Some("match-1"));
//! assert_eq!(ev.pending, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::StopStrategy;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Queue events ===
    /// Arbitration loop started accepting events.
    QueueStarted,

    /// Stop requested.
    ///
    /// Sets:
    /// - `strategy`: requested stop strategy
    /// - `pending`: number of live sequences at the time of the request
    StopRequested,

    /// Arbitration loop exited.
    ///
    /// Sets:
    /// - `strategy`: strategy that ended the loop
    QueueStopped,

    // === Sequence events ===
    /// A new sequence was created for a key and its execution loop spawned.
    ///
    /// Sets:
    /// - `key`, `sequence`
    SequenceCreated,

    /// A sequence found its backlog empty and reported termination.
    ///
    /// Sets:
    /// - `key`, `sequence`
    SequenceDrained,

    /// The arbitration loop removed a drained sequence from the directory.
    ///
    /// Sets:
    /// - `key`, `sequence`
    SequenceRemoved,

    /// A sequence was force-terminated by an immediate stop.
    ///
    /// Sets:
    /// - `key`, `sequence`
    /// - `pending`: number of abandoned waiting jobs
    SequenceTerminated,

    // === Job events ===
    /// Job accepted into a sequence backlog.
    ///
    /// Sets:
    /// - `key`, `sequence`, `priority`, `unique` (if any)
    /// - `pending`: backlog length after insertion
    JobEnqueued,

    /// Job rejected by a sequence (duplicate unique token).
    ///
    /// Sets:
    /// - `key`, `sequence`, `priority`, `unique`
    /// - `reason`: rejection label
    JobRejected,

    /// Submission hit a sequence that had already drained; retried on a fresh one.
    ///
    /// Sets:
    /// - `key`, `sequence` (the drained one)
    DrainRaceRetried,

    /// Job popped from the backlog and about to run.
    ///
    /// Sets:
    /// - `key`, `sequence`, `priority`, `unique` (if any)
    /// - `pending`: backlog length after the pop
    JobStarting,

    /// Job action returned.
    ///
    /// Sets:
    /// - `key`, `sequence`, `priority`
    JobCompleted,

    /// Job action panicked; the sequence moved on to the next job.
    ///
    /// Sets:
    /// - `key`, `sequence`, `priority`
    /// - `reason`: panic message
    JobPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Sequence key (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// Process-unique id of the sequence instance serving `key`.
    pub sequence: Option<u64>,
    /// Job priority.
    pub priority: Option<i64>,
    /// Job unique token.
    pub unique: Option<Arc<str>>,
    /// Backlog length (or live sequence count for queue events).
    pub pending: Option<usize>,
    /// Stop strategy for queue stop events.
    pub strategy: Option<StopStrategy>,
    /// Human-readable reason (rejections, panics, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            sequence: None,
            priority: None,
            unique: None,
            pending: None,
            strategy: None,
            reason: None,
        }
    }

    /// Attaches a sequence key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a sequence instance id.
    #[inline]
    pub fn with_sequence(mut self, id: u64) -> Self {
        self.sequence = Some(id);
        self
    }

    /// Attaches a job priority.
    #[inline]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a unique token (ignored when `None`).
    #[inline]
    pub fn with_unique(mut self, unique: Option<&Arc<str>>) -> Self {
        self.unique = unique.cloned();
        self
    }

    /// Attaches a backlog / directory length.
    #[inline]
    pub fn with_pending(mut self, n: usize) -> Self {
        self.pending = Some(n);
        self
    }

    /// Attaches a stop strategy.
    #[inline]
    pub fn with_strategy(mut self, strategy: StopStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }

    /// True for events the subscriber machinery reports about itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
