//! # Ordered backlog of waiting jobs for one sequence.
//!
//! Invariant: jobs are non-decreasing by priority, and equal priorities keep
//! insertion order. Jobs enter one at a time at a computed index, so the order
//! is stable by construction; nothing is ever sorted.
//!
//! ```text
//! priorities [1, 2, 2, 3]  insert(2) → scan for first p > 2 → index 3
//!            [1, 2, 2, 2*, 3]
//! ```
//!
//! The backlog is not synchronized; the owning sequence guards it with its lock.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::jobs::ActionRef;

/// A job waiting in a backlog.
pub(crate) struct QueuedJob {
    pub priority: i64,
    pub unique: Option<Arc<str>>,
    pub action: ActionRef,
}

/// Priority-ordered list of waiting jobs.
#[derive(Default)]
pub(crate) struct Backlog {
    jobs: VecDeque<QueuedJob>,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `job` after every waiting job with priority `<= job.priority`.
    pub fn insert(&mut self, job: QueuedJob) {
        let idx = insert_index(self.jobs.iter().map(|j| j.priority), job.priority);
        self.jobs.insert(idx, job);
    }

    /// True if a waiting job carries `unique`.
    pub fn contains_unique(&self, unique: &str) -> bool {
        self.jobs
            .iter()
            .any(|j| j.unique.as_deref() == Some(unique))
    }

    /// Pops the head (highest priority, earliest among equals).
    pub fn shift(&mut self) -> Option<QueuedJob> {
        self.jobs.pop_front()
    }

    /// Drops every waiting job, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.jobs.len();
        self.jobs.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Linear scan for the first priority strictly greater than `priority`.
fn insert_index(priorities: impl Iterator<Item = i64>, priority: i64) -> usize {
    let mut idx = 0;
    for p in priorities {
        if priority < p {
            return idx;
        }
        idx += 1;
    }
    idx
}
