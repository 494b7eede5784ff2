//! # Run a single job on its sequence's task.
//!
//! Executes one popped job to completion and publishes lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   publish JobStarting → action.execute().await → publish JobCompleted
//!
//! Panic:
//!   publish JobStarting → action panics → catch_unwind → publish JobPanicked
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `JobCompleted` or `JobPanicked`
//! - Runs on the calling task: the sequence does not move on until the action returns
//! - A panic never escapes: the sequence continues with the next job
//! - No retry, no timeout: the action is awaited as-is

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::{
    core::backlog::QueuedJob,
    events::{Bus, Event, EventKind},
    subscribers::panic_message,
};

/// Executes `job` to completion, isolating panics.
///
/// `pending` is the backlog length right after the job was popped.
pub(crate) async fn run_job(bus: &Bus, key: &str, sequence: u64, job: QueuedJob, pending: usize) {
    let QueuedJob {
        priority,
        unique,
        action,
    } = job;

    bus.publish(
        Event::new(EventKind::JobStarting)
            .with_key(key)
            .with_sequence(sequence)
            .with_priority(priority)
            .with_unique(unique.as_ref())
            .with_pending(pending),
    );

    let res = AssertUnwindSafe(async move { action.execute().await })
        .catch_unwind()
        .await;

    match res {
        Ok(()) => bus.publish(
            Event::new(EventKind::JobCompleted)
                .with_key(key)
                .with_sequence(sequence)
                .with_priority(priority),
        ),
        Err(panic_err) => bus.publish(
            Event::new(EventKind::JobPanicked)
                .with_key(key)
                .with_sequence(sequence)
                .with_priority(priority)
                .with_reason(panic_message(&*panic_err)),
        ),
    }
}
