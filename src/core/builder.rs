use std::sync::Arc;

use crate::{core::QueueConfig, subscribers::Subscribe};

use super::queue::Queue;

/// Builder for constructing a [`Queue`] with optional subscribers.
pub struct QueueBuilder {
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (sequence lifecycle, job outcomes, stops)
    /// through dedicated workers with bounded queues. Workers start with [`Queue::run`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the queue. Does not require a running tokio runtime.
    pub fn build(self) -> Arc<Queue> {
        Arc::new(Queue::new_internal(self.cfg, self.subscribers))
    }
}
