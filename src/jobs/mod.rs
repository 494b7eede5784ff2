//! # Job abstractions.
//!
//! This module provides the caller-facing job types:
//! - [`Action`] - capability trait for the opaque unit of work (consumed exactly once)
//! - [`ActionFn`] - async closure-backed action
//! - [`BlockingFn`] - synchronous closure-backed action, run on the blocking pool
//! - [`Job`] - submission bundling a sequence key, priority, unique token and action
//! - [`priority`] - conventional priority levels

mod action;
mod action_fn;
mod job;

pub use action::{Action, ActionRef, BoxActionFuture};
pub use action_fn::{ActionFn, BlockingFn};
pub use job::{Job, priority};
