//! # keyqueue
//!
//! **Keyqueue** is an in-process keyed job queue for tokio.
//!
//! Every job carries a *sequence key*. Jobs sharing a key run strictly one at a
//! time in priority order; jobs on different keys run in parallel. A job may carry
//! a *unique token*: while a job with the same token is still waiting on its key,
//! a second one is rejected. The queue stops either immediately (abandoning waiting
//! jobs) or by draining every backlog first.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Job(key "a") │   │ Job(key "a") │   │ Job(key "b") │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Queue / QueueHandle  (submit, try_submit, stop, graceful_stop)   │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼ [commands]  [stops]
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Arbiter (single loop)                                            │
//! │  - directory: key → Sequence                                      │
//! │  - creates sequences, rejects duplicates, retires drained ones    │
//! └──────┬─────────────────────────────────────┬──────────────────────┘
//!        ▼                                     ▼             ▲
//!     ┌─────────────────────┐   ┌─────────────────────┐      │ [retirements]
//!     │ Sequence "a"        │   │ Sequence "b"        │ ─────┘
//!     │ backlog: [p1, p2]   │   │ backlog: [p3]       │
//!     │ one job at a time   │   │ one job at a time   │
//!     └┬────────────────────┘   └┬────────────────────┘
//!      │ Publishes: JobStarting, JobCompleted, JobPanicked, SequenceDrained
//!      ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                  (capacity: QueueConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │      (in Queue)        │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Sequence lifecycle
//! ```text
//! Submit(key) ──► Arbiter: no live sequence? ──► create, enqueue, spawn Sequence::run()
//!
//! loop {
//!   ├─► lock: state Terminated or token cancelled ─► exit (no report)
//!   ├─► lock: pop head of backlog
//!   │       ├─ Some(job) ──► JobStarting ─► action ─► JobCompleted | JobPanicked
//!   │       └─ None
//!   │           ├─ linger > 0 and not yet waited ─► wait for arrival / timeout
//!   │           └─ otherwise: state = Draining ─► report Retirement{key, id}, exit
//! }
//!
//! Arbiter on Retirement{key, id}: remove entry only if it still points at `id`.
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                      |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------|
//! | **Queue**         | Submit keyed jobs, inspect live sequences, stop the runtime. | [`Queue`], [`QueueHandle`]              |
//! | **Jobs**          | Describe a unit of work with key, priority and unique token. | [`Job`], [`Action`], [`ActionFn`]       |
//! | **Stopping**      | Abandon waiting work or drain every backlog first.           | [`StopStrategy`]                        |
//! | **Subscriber API**| Hook into queue lifecycle events (logging, metrics, custom). | [`Subscribe`]                           |
//! | **Errors**        | Typed errors for submission and runtime misuse.              | [`SubmitError`], [`RuntimeError`]       |
//! | **Configuration** | Centralize runtime settings.                                 | [`QueueConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use keyqueue::{Job, Queue, QueueConfig, SubmitError, priority};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn keyqueue::Subscribe>> = vec![Arc::new(keyqueue::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn keyqueue::Subscribe>> = Vec::new();
//!
//!     let queue = Queue::builder(QueueConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!     let runner = queue.spawn();
//!
//!     let log = Arc::new(Mutex::new(Vec::new()));
//!     for (name, prio) in [("low", priority::LOW), ("high", priority::HIGH)] {
//!         let log = Arc::clone(&log);
//!         queue
//!             .submit(
//!                 Job::from_fn("invoice-42", move || async move {
//!                     log.lock().unwrap().push(name);
//!                 })
//!                 .with_priority(prio)
//!                 .with_unique(name),
//!             )
//!             .await?;
//!     }
//!
//!     // Rejected while the job carrying "low" is still waiting on this key.
//!     match queue.submit(Job::from_fn("invoice-42", || async {}).with_unique("low")).await {
//!         Ok(()) | Err(SubmitError::DuplicateRejected { .. }) => {}
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     queue.graceful_stop().await;
//!     runner.await??;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use core::{Queue, QueueBuilder, QueueConfig, QueueHandle, StopStrategy};
pub use error::{RuntimeError, SubmitError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{Action, ActionFn, ActionRef, BlockingFn, BoxActionFuture, Job, priority};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
