//! # Closure-backed actions.
//!
//! [`ActionFn`] wraps `F: FnOnce() -> Fut` and produces the future on execution.
//! [`BlockingFn`] wraps a synchronous `F: FnOnce()` and runs it through
//! [`tokio::task::spawn_blocking`], so an action that blocks the thread never stalls
//! the async workers that drive other keys.
//!
//! ## Example
//! ```rust
//! use keyqueue::{ActionFn, ActionRef, BlockingFn};
//!
//! let a: ActionRef = ActionFn::boxed(|| async move {
//!     // async work...
//! });
//! let b: ActionRef = BlockingFn::boxed(|| {
//!     std::thread::sleep(std::time::Duration::from_millis(1));
//! });
//! # let _ = (a, b);
//! ```

use std::future::Future;

use crate::jobs::action::{Action, ActionRef, BoxActionFuture};

/// Async closure-backed action.
#[derive(Debug)]
pub struct ActionFn<F> {
    f: F,
}

impl<F> ActionFn<F> {
    /// Creates a new function-backed action.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> ActionFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates the action and returns it type-erased.
    pub fn boxed(f: F) -> ActionRef {
        Box::new(Self::new(f))
    }
}

impl<F, Fut> Action for ActionFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn execute(self: Box<Self>) -> BoxActionFuture {
        let f = self.f;
        Box::pin(f())
    }
}

/// Synchronous closure-backed action executed on the blocking thread pool.
#[derive(Debug)]
pub struct BlockingFn<F> {
    f: F,
}

impl<F> BlockingFn<F> {
    /// Creates a new blocking action.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> BlockingFn<F>
where
    F: FnOnce() + Send + 'static,
{
    /// Creates the action and returns it type-erased.
    pub fn boxed(f: F) -> ActionRef {
        Box::new(Self::new(f))
    }
}

impl<F> Action for BlockingFn<F>
where
    F: FnOnce() + Send + 'static,
{
    fn execute(self: Box<Self>) -> BoxActionFuture {
        let f = self.f;
        Box::pin(async move {
            if let Err(err) = tokio::task::spawn_blocking(f).await {
                // Surface the panic on the sequence task, where it is isolated.
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        })
    }
}
