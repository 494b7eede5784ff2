//! # Event subscribers for the keyqueue runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the optional built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Arbiter / Sequence ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                         │
//!                                                         ▼
//!                                                   SubscriberSet::emit
//!                                                    ┌────┴────┬─────────┐
//!                                                    ▼         ▼         ▼
//!                                                LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
