//! # LogWriter: event renderer over `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records with
//! structured fields. Install any `tracing` subscriber in the host process to see them.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO keyqueue: queue started
//! DEBUG keyqueue: sequence created key="match-1" sequence=3
//! DEBUG keyqueue: job enqueued key="match-1" sequence=3 priority=2 unique=None pending=1
//! WARN keyqueue: job rejected key="match-1" sequence=3 unique=Some("recalc") reason=Some("enqueue_duplicate")
//! INFO keyqueue: drain race retried key="match-1" sequence=3
//! ERROR keyqueue: job panicked key="match-1" sequence=4 reason=Some("boom")
//! INFO keyqueue: queue stopped strategy=Some(Drain)
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::QueueStarted => {
                tracing::info!(target: "keyqueue", "queue started");
            }
            EventKind::StopRequested => {
                tracing::info!(target: "keyqueue", strategy = ?e.strategy, live = ?e.pending, "stop requested");
            }
            EventKind::QueueStopped => {
                tracing::info!(target: "keyqueue", strategy = ?e.strategy, "queue stopped");
            }
            EventKind::SequenceCreated => {
                tracing::debug!(target: "keyqueue", key, sequence = ?e.sequence, "sequence created");
            }
            EventKind::SequenceDrained => {
                tracing::debug!(target: "keyqueue", key, sequence = ?e.sequence, "sequence drained");
            }
            EventKind::SequenceRemoved => {
                tracing::debug!(target: "keyqueue", key, sequence = ?e.sequence, "sequence removed");
            }
            EventKind::SequenceTerminated => {
                tracing::info!(target: "keyqueue", key, sequence = ?e.sequence, abandoned = ?e.pending, "sequence terminated");
            }
            EventKind::JobEnqueued => {
                tracing::debug!(
                    target: "keyqueue",
                    key,
                    sequence = ?e.sequence,
                    priority = ?e.priority,
                    unique = ?e.unique,
                    pending = ?e.pending,
                    "job enqueued"
                );
            }
            EventKind::JobRejected => {
                tracing::warn!(
                    target: "keyqueue",
                    key,
                    sequence = ?e.sequence,
                    unique = ?e.unique,
                    reason = ?e.reason,
                    "job rejected"
                );
            }
            EventKind::DrainRaceRetried => {
                tracing::info!(target: "keyqueue", key, sequence = ?e.sequence, "drain race retried");
            }
            EventKind::JobStarting => {
                tracing::trace!(target: "keyqueue", key, sequence = ?e.sequence, priority = ?e.priority, "job starting");
            }
            EventKind::JobCompleted => {
                tracing::trace!(target: "keyqueue", key, sequence = ?e.sequence, "job completed");
            }
            EventKind::JobPanicked => {
                tracing::error!(target: "keyqueue", key, sequence = ?e.sequence, reason = ?e.reason, "job panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "keyqueue", subscriber = key, reason = ?e.reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "keyqueue", subscriber = key, reason = ?e.reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
