//! # Queue: public entry point, submission API and shutdown.
//!
//! The [`Queue`] owns the event bus, the configuration and the (not yet started)
//! arbitration loop. [`Queue::run`] drives the loop on the calling task;
//! submissions and stop requests reach it over channels.
//!
//! ## High-level architecture
//! ```text
//! Queue::run():
//!   - take Arbiter (once; second call → RuntimeError::AlreadyRunning)
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - Arbiter::run().await
//!   - publish QueueStopped, cancel `exited`, flush subscribers
//!
//! Queue::submit(job)      ──► [commands] ──► Arbiter ──► oneshot reply ──► caller
//! Queue::stop_with(s)     ──► [stops]    ──► Arbiter ... exits ──► `exited` cancelled ──► caller
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use keyqueue::{Job, Queue, QueueConfig, priority};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = Queue::new(QueueConfig::default());
//!     let runner = queue.spawn();
//!
//!     let done = Arc::new(AtomicUsize::new(0));
//!     for i in 0..3 {
//!         let done = Arc::clone(&done);
//!         queue
//!             .submit(Job::from_fn("match-1", move || async move {
//!                 done.fetch_add(1, Ordering::SeqCst);
//!             })
//!             .with_priority(priority::MEDIUM + i))
//!             .await?;
//!     }
//!
//!     queue.graceful_stop().await;
//!     runner.await??;
//!     assert_eq!(done.load(Ordering::SeqCst), 3);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        arbiter::{Arbiter, Command},
        config::QueueConfig,
        strategy::StopStrategy,
    },
    error::{RuntimeError, SubmitError},
    events::{Bus, Event, EventKind},
    jobs::Job,
    subscribers::{Subscribe, SubscriberSet},
};

/// Cloneable submission handle.
///
/// Holds only the sending side of the submission channel; cheap to clone and
/// hand to producers.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<Command>,
}

impl QueueHandle {
    /// Submits a job and waits for the arbitration loop to acknowledge it.
    ///
    /// Returns once the job is in a sequence backlog; it does **not** wait for the job to run.
    ///
    /// ### Errors
    /// - [`SubmitError::DuplicateRejected`]: same unique token already waiting on this key
    /// - [`SubmitError::QueueStopped`]: the loop has exited or is stopping immediately
    pub async fn submit(&self, job: Job) -> Result<(), SubmitError> {
        let (reply, ack) = oneshot::channel();
        self.tx
            .send(Command::Submit {
                job,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SubmitError::QueueStopped)?;
        ack.await.map_err(|_| SubmitError::QueueStopped)?
    }

    /// Submits without waiting for acknowledgement (fire-and-forget).
    ///
    /// A duplicate is dropped silently. Fails with [`SubmitError::Full`] if the
    /// submission channel is full and [`SubmitError::QueueStopped`] if it is closed.
    pub fn try_submit(&self, job: Job) -> Result<(), SubmitError> {
        self.tx
            .try_send(Command::Submit { job, reply: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SubmitError::Full,
                mpsc::error::TrySendError::Closed(_) => SubmitError::QueueStopped,
            })
    }

    /// Returns the sorted keys of live sequences, as seen by the arbitration loop.
    pub async fn sequences(&self) -> Result<Vec<String>, SubmitError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| SubmitError::QueueStopped)?;
        rx.await.map_err(|_| SubmitError::QueueStopped)
    }
}

/// Keyed job queue: sequential per key, parallel across keys.
pub struct Queue {
    cfg: QueueConfig,
    bus: Bus,
    handle: QueueHandle,
    stops: mpsc::Sender<StopStrategy>,
    arbiter: Mutex<Option<Arbiter>>,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    exited: CancellationToken,
}

impl Queue {
    /// Creates an idle queue without subscribers. Call [`run`](Self::run) (or
    /// [`spawn`](Self::spawn)) to start accepting work.
    pub fn new(cfg: QueueConfig) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    /// Returns a builder for a queue with subscribers.
    pub fn builder(cfg: QueueConfig) -> super::builder::QueueBuilder {
        super::builder::QueueBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: QueueConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (tx, commands) = mpsc::channel(cfg.submit_capacity_clamped());
        // Every stop call waits for `exited`, so a small buffer is enough.
        let (stops, stop_rx) = mpsc::channel(8);
        let arbiter = Arbiter::new(commands, stop_rx, bus.clone(), cfg.linger());

        Self {
            cfg,
            bus,
            handle: QueueHandle { tx },
            stops,
            arbiter: Mutex::new(Some(arbiter)),
            subscribers: Mutex::new(subscribers),
            exited: CancellationToken::new(),
        }
    }

    /// Runs the arbitration loop on the calling task until the queue is stopped.
    ///
    /// ### Errors
    /// [`RuntimeError::AlreadyRunning`] if the loop was already started on this queue.
    ///
    /// ### Cancellation
    /// Dropping this future behaves like an immediate stop: every sequence is
    /// cancelled, pending submissions resolve to `QueueStopped` and the
    /// subscriber workers wind down.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let arbiter = self
            .arbiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RuntimeError::AlreadyRunning)?;

        let subscribers = std::mem::take(
            &mut *self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let listener = self.subscriber_listener(subscribers);
        let listener_stop = listener
            .as_ref()
            .map(|(stop, _)| stop.clone().drop_guard());

        let exited = self.exited.clone().drop_guard();
        let strategy = arbiter.run().await;

        let mut stopped = Event::new(EventKind::QueueStopped);
        if let Some(strategy) = strategy {
            stopped = stopped.with_strategy(strategy);
        }
        self.bus.publish(stopped);
        drop(exited);

        drop(listener_stop);
        if let Some((_, join)) = listener {
            let _ = join.await;
        }
        Ok(())
    }

    /// Runs the arbitration loop on a new tokio task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<(), RuntimeError>> {
        let me = Arc::clone(self);
        tokio::spawn(async move { me.run().await })
    }

    /// Submits a job and waits for acknowledgement. See [`QueueHandle::submit`].
    pub async fn submit(&self, job: Job) -> Result<(), SubmitError> {
        self.handle.submit(job).await
    }

    /// Fire-and-forget submission. See [`QueueHandle::try_submit`].
    pub fn try_submit(&self, job: Job) -> Result<(), SubmitError> {
        self.handle.try_submit(job)
    }

    /// Sorted keys of live sequences. See [`QueueHandle::sequences`].
    pub async fn sequences(&self) -> Result<Vec<String>, SubmitError> {
        self.handle.sequences().await
    }

    /// Returns a cloneable submission handle.
    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Immediate stop: abandons every waiting job and returns once the loop has exited.
    ///
    /// In-flight actions are not interrupted or awaited.
    pub async fn stop(&self) {
        self.stop_with(StopStrategy::Immediate).await
    }

    /// Graceful stop: returns once every sequence has run its backlog and the loop has exited.
    ///
    /// Blocks indefinitely if producers keep submitting work.
    pub async fn graceful_stop(&self) {
        self.stop_with(StopStrategy::Drain).await
    }

    /// Requests a stop with `strategy` and waits until the arbitration loop has exited.
    ///
    /// Returns immediately if it already has. If the loop was never started, waits until
    /// [`run`](Self::run) starts and processes the request.
    pub async fn stop_with(&self, strategy: StopStrategy) {
        if self.exited.is_cancelled() {
            return;
        }
        // A closed channel means the loop is gone and `exited` is (about to be) cancelled.
        let _ = self.stops.send(strategy).await;
        self.exited.cancelled().await;
    }

    /// True once the arbitration loop has exited.
    pub fn is_stopped(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Creates a receiver observing subsequent runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns the configuration this queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.cfg
    }

    /// Forwards bus events to the subscriber set until `stop` is cancelled, then flushes.
    fn subscriber_listener(
        &self,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Option<(CancellationToken, JoinHandle<()>)> {
        if subscribers.is_empty() {
            return None;
        }

        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(subscribers, self.bus.clone());
        let stop = CancellationToken::new();
        let stop_rx = stop.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop_rx.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });
        Some((stop, join))
    }
}
