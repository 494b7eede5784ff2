//! Error types used by the keyqueue runtime.
//!
//! This module defines three error enums:
//!
//! - [`SubmitError`]: errors returned to a submitter by [`Queue::submit`](crate::Queue::submit).
//! - [`RuntimeError`]: errors raised by the arbitration loop itself.
//! - `EnqueueError`: crate-private outcome of a sequence enqueue; never leaves the queue.
//!
//! All types provide `as_label` for logging/metrics.

use std::sync::Arc;

use thiserror::Error;

/// # Errors returned to job submitters.
///
/// A rejected job is discarded: it is never enqueued and never executed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// A job with the same unique token is already waiting on this key.
    #[error("duplicate job rejected: key={key:?} unique={unique:?}")]
    DuplicateRejected {
        /// Sequence key the job targeted.
        key: Arc<str>,
        /// Unique token that collided.
        unique: Arc<str>,
    },

    /// The queue has stopped (or is stopping immediately) and accepts no more work.
    #[error("queue stopped")]
    QueueStopped,

    /// Submission channel is full (only from non-waiting submission).
    #[error("submission channel full")]
    Full,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use keyqueue::SubmitError;
    ///
    /// assert_eq!(SubmitError::QueueStopped.as_label(), "submit_queue_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::DuplicateRejected { .. } => "submit_duplicate_rejected",
            SubmitError::QueueStopped => "submit_queue_stopped",
            SubmitError::Full => "submit_full",
        }
    }
}

/// # Errors produced by the arbitration loop.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// `run()` was called while the loop was already running (or had already run).
    #[error("arbitration loop already running or finished")]
    AlreadyRunning,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
        }
    }
}

/// Outcome of `Sequence::enqueue` when the job was not accepted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnqueueError {
    /// Unique token already present among waiting jobs.
    #[error("duplicate")]
    Duplicate,

    /// Sequence has begun its termination handshake; the caller must use a fresh one.
    #[error("sequence drained")]
    Drained,
}

impl EnqueueError {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            EnqueueError::Duplicate => "enqueue_duplicate",
            EnqueueError::Drained => "enqueue_drained",
        }
    }
}
