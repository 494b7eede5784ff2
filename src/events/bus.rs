//! # Event bus shared by the arbiter, the sequences and the job runner.
//!
//! [`Bus`] wraps one [`tokio::sync::broadcast`] channel. Publishing never waits:
//! the arbitration loop and the sequence tasks emit events and move on.
//!
//! ```text
//!   Arbiter    ──┐
//!   Sequence 1 ──┼──► Bus ──► subscriber_listener (Queue::run) ──► SubscriberSet
//!   Sequence N ──┘       └──► Queue::subscribe() receivers
//! ```
//!
//! The ring buffer holds `QueueConfig::bus_capacity` events for all receivers
//! together. A receiver that falls further behind sees `RecvError::Lagged(n)`.
//! Events sent while nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing end of the event channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Sends `ev` to every live receiver; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
