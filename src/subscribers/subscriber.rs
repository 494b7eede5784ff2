//! # Subscriber trait: observe queue events off the hot path.
//!
//! Implement [`Subscribe`] to receive every [`Event`] the arbitration loop and the
//! sequences publish. Delivery happens on a worker task owned by the
//! [`SubscriberSet`](crate::SubscriberSet), one per subscriber, fed by a bounded
//! queue of [`Subscribe::queue_capacity`] events.
//!
//! A subscriber that falls behind loses events (reported as `SubscriberOverflow`);
//! one that panics is reported as `SubscriberPanicked` and keeps receiving.
//! Neither outcome reaches a job or the arbitration loop.
//!
//! ## Example
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use async_trait::async_trait;
//! use keyqueue::{Event, EventKind, Subscribe};
//!
//! /// Counts panicked jobs per sequence key.
//! #[derive(Default)]
//! struct PanicsPerKey(Mutex<HashMap<String, u64>>);
//!
//! #[async_trait]
//! impl Subscribe for PanicsPerKey {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind != EventKind::JobPanicked {
//!             return;
//!         }
//!         if let (Some(key), Ok(mut map)) = (ev.key.as_deref(), self.0.lock()) {
//!             *map.entry(key.to_owned()).or_default() += 1;
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "panics_per_key" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Consumer of queue events.
///
/// `on_event` should not block the executor; offload heavy work.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Events arrive in publish order for a given subscriber.
    async fn on_event(&self, event: &Event);

    /// Label used in overflow and panic reports. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
