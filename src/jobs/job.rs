//! # Job: a unit of work submitted to the queue.
//!
//! Bundles together:
//! - the sequence key (partitions execution; jobs sharing a key never overlap)
//! - the priority (lower value runs first; ties run in submission order)
//! - an optional unique token (a second *waiting* job with the same token is rejected)
//! - the [`Action`] to run
//!
//! ## Example
//! ```rust
//! use keyqueue::{Job, priority};
//!
//! let job = Job::from_fn("match-1", || async move {
//!     // recalculate standings...
//! })
//! .with_priority(priority::LOW)
//! .with_unique("recalculate");
//!
//! assert_eq!(job.key(), "match-1");
//! assert_eq!(job.priority(), priority::LOW);
//! assert_eq!(job.unique(), Some("recalculate"));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::jobs::action::{Action, ActionRef};
use crate::jobs::action_fn::{ActionFn, BlockingFn};

/// Conventional priority levels. Any `i64` is accepted; lower runs first.
pub mod priority {
    /// Runs before `MEDIUM` and `LOW`.
    pub const HIGH: i64 = 1;
    /// Middle band.
    pub const MEDIUM: i64 = 2;
    /// Runs after `HIGH` and `MEDIUM`.
    pub const LOW: i64 = 3;
}

/// Submitted unit of work.
pub struct Job {
    key: Arc<str>,
    priority: i64,
    unique: Option<Arc<str>>,
    action: ActionRef,
}

impl Job {
    /// Creates a job with priority `0` and no unique token.
    pub fn new(key: impl Into<Arc<str>>, action: ActionRef) -> Self {
        Self {
            key: key.into(),
            priority: 0,
            unique: None,
            action,
        }
    }

    /// Creates a job from any [`Action`] implementor.
    pub fn with_action<A: Action>(key: impl Into<Arc<str>>, action: A) -> Self {
        Self::new(key, Box::new(action))
    }

    /// Creates a job running an async closure.
    pub fn from_fn<F, Fut>(key: impl Into<Arc<str>>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(key, ActionFn::boxed(f))
    }

    /// Creates a job running a synchronous (possibly blocking) closure.
    pub fn blocking<F>(key: impl Into<Arc<str>>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(key, BlockingFn::boxed(f))
    }

    /// Returns a new job with updated priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Returns a new job with a unique token. An empty token means "not unique".
    pub fn with_unique(mut self, unique: impl Into<Arc<str>>) -> Self {
        let unique = unique.into();
        self.unique = (!unique.is_empty()).then_some(unique);
        self
    }

    /// Returns the sequence key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the priority.
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Returns the unique token, if any.
    pub fn unique(&self) -> Option<&str> {
        self.unique.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Arc<str>, i64, Option<Arc<str>>, ActionRef) {
        (self.key, self.priority, self.unique, self.action)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("unique", &self.unique)
            .finish_non_exhaustive()
    }
}
