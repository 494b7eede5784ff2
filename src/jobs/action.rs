//! # Action: the opaque payload of a job.
//!
//! The queue never inspects an action; it only decides **when** to run it.
//! An action is consumed by [`Action::execute`], so it runs at most once and the
//! queue never clones it.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Action::execute`].
pub type BoxActionFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Owned, type-erased action as stored in a sequence backlog.
pub type ActionRef = Box<dyn Action>;

/// # Zero-argument unit of work.
///
/// Implement this for your own types, or use [`ActionFn`](crate::ActionFn) /
/// [`BlockingFn`](crate::BlockingFn) for closures.
///
/// Failures are the action's own business: a returned future that completes
/// means "done", a panic is caught by the sequence and the next job runs anyway.
///
/// # Example
/// ```
/// use keyqueue::{Action, BoxActionFuture};
///
/// struct Recalculate { match_id: u64 }
///
/// impl Action for Recalculate {
///     fn execute(self: Box<Self>) -> BoxActionFuture {
///         Box::pin(async move {
///             let _ = self.match_id;
///             // do work...
///         })
///     }
/// }
/// ```
pub trait Action: Send + 'static {
    /// Consumes the action and returns the future that performs it.
    fn execute(self: Box<Self>) -> BoxActionFuture;
}
