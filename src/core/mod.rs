//! Runtime core: arbitration, sequences and lifecycle.
//!
//! The public API from this module is [`Queue`] (with [`QueueHandle`] and
//! [`QueueBuilder`]), its [`QueueConfig`] and the [`StopStrategy`] it stops with.
//!
//! Internal modules:
//! - [`arbiter`]: single loop owning the `key → sequence` directory;
//! - [`sequence`]: per-key task running jobs one at a time;
//! - [`backlog`]: priority-ordered waiting jobs of one sequence;
//! - [`runner`]: executes one job with panic isolation and event publishing.

mod arbiter;
mod backlog;
mod builder;
mod config;
mod queue;
mod runner;
mod sequence;
mod strategy;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use queue::{Queue, QueueHandle};
pub use strategy::StopStrategy;
