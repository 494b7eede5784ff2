//! Subscribers shipped with the crate, each behind its own feature.

mod log;

/// Structured `tracing` output for every queue event (feature `logging`).
pub use log::LogWriter;
