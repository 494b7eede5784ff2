//! # Global queue configuration.
//!
//! Provides [`QueueConfig`] centralized settings for the queue runtime.
//!
//! ## Sentinel values
//! - `linger = 0s` → disabled: a sequence retires as soon as its backlog is empty
//! - `submit_capacity` / `bus_capacity` are clamped to a minimum of 1

use std::time::Duration;

/// Configuration for the queue runtime.
///
/// ## Field semantics
/// - `submit_capacity`: Buffer of the submission channel into the arbitration loop
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `linger`: Idle grace period before an empty sequence retires (`0s` = retire immediately)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Capacity of the submission channel.
    ///
    /// `submit()` waits while the channel is full; `try_submit()` returns
    /// [`SubmitError::Full`](crate::SubmitError::Full). This is transport buffering,
    /// not a bound on backlog size.
    pub submit_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// How long an empty sequence waits for new work before retiring.
    ///
    /// - `Duration::ZERO` = no linger (retire immediately)
    /// - `> 0` = a job arriving within the window is run by the same sequence
    ///
    /// Absorbs bursty re-submission on a key at the cost of keeping an idle task alive.
    pub linger: Duration,
}

impl QueueConfig {
    /// Returns the submission channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn submit_capacity_clamped(&self) -> usize {
        self.submit_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the idle linger as an `Option`.
    ///
    /// - `None` → retire as soon as the backlog is empty
    /// - `Some(d)` → wait up to `d` for new work
    #[inline]
    pub fn linger(&self) -> Option<Duration> {
        if self.linger == Duration::ZERO {
            None
        } else {
            Some(self.linger)
        }
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `submit_capacity = 1024`
    /// - `bus_capacity = 1024`
    /// - `linger = 0s` (disabled)
    fn default() -> Self {
        Self {
            submit_capacity: 1024,
            bus_capacity: 1024,
            linger: Duration::ZERO,
        }
    }
}
