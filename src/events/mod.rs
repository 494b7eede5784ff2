//! Queue events and the bus that carries them.
//!
//! - [`Event`] / [`EventKind`]: what happened, to which key and sequence instance.
//! - [`Bus`]: broadcast channel the arbiter, the sequences and the job runner publish to.
//!
//! `Queue::run` forwards bus traffic to the configured subscribers, and
//! [`Queue::subscribe`](crate::Queue::subscribe) hands out raw receivers.
//! Nothing in the queue reads events back, so losing one never changes behaviour.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
