//! # Arbiter - the queue's single-threaded arbitration loop.
//!
//! Owns the directory `key → sequence` and is the only place that mutates it.
//! No lock guards the directory: every structural change is an event handled
//! one at a time by this loop.
//!
//! ## Architecture
//! ```text
//! Queue::stop_with ──► [stops]       ─┐
//! Sequence::run    ──► [retirements] ─┼─► Arbiter::run (biased select, in this order)
//! QueueHandle      ──► [commands]    ─┘        │
//!                                              ├─► Submit(job)     → existing.enqueue | create + enqueue
//!                                              ├─► Snapshot        → sorted keys
//!                                              ├─► Retirement(k,id)→ remove k if id matches
//!                                              └─► Stop(strategy)  → Immediate: terminate all, exit
//!                                                                    Drain: exit once directory and buffer are empty
//! ```
//!
//! ## Drain race
//! A submission for `k` can meet a sequence that has just found its backlog empty:
//! - retirement handled first → entry gone → fresh sequence created;
//! - submission handled first → `enqueue` returns `Drained` with the job →
//!   stale entry removed → same job placed on a fresh sequence.
//!
//! The late retirement of the stale sequence carries its id, which no longer
//! matches the entry for `k`, so it is ignored. Exactly one reply per submission.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        backlog::QueuedJob,
        sequence::{Refused, Retirement, Sequence},
        strategy::StopStrategy,
    },
    error::{EnqueueError, SubmitError},
    events::{Bus, Event, EventKind},
    jobs::Job,
};

/// Requests served by the arbitration loop.
pub(crate) enum Command {
    /// Submit a job; `reply` is `None` for fire-and-forget submissions.
    Submit {
        job: Job,
        reply: Option<oneshot::Sender<Result<(), SubmitError>>>,
    },
    /// Sorted list of live sequence keys.
    Snapshot { reply: oneshot::Sender<Vec<String>> },
}

/// Directory entry for a live sequence.
struct Handle {
    sequence: Arc<Sequence>,
    /// Child of the runtime token; cancelled on immediate stop.
    cancel: CancellationToken,
}

/// Arbitration loop state. Consumed by [`Arbiter::run`].
pub(crate) struct Arbiter {
    directory: HashMap<Arc<str>, Handle>,
    commands: mpsc::Receiver<Command>,
    stops: mpsc::Receiver<StopStrategy>,
    retired_rx: mpsc::UnboundedReceiver<Retirement>,
    retired_tx: mpsc::UnboundedSender<Retirement>,
    bus: Bus,
    runtime_token: CancellationToken,
    linger: Option<Duration>,
    strategy: Option<StopStrategy>,
}

impl Arbiter {
    pub fn new(
        commands: mpsc::Receiver<Command>,
        stops: mpsc::Receiver<StopStrategy>,
        bus: Bus,
        linger: Option<Duration>,
    ) -> Self {
        let (retired_tx, retired_rx) = mpsc::unbounded_channel();
        Self {
            directory: HashMap::new(),
            commands,
            stops,
            retired_rx,
            retired_tx,
            bus,
            runtime_token: CancellationToken::new(),
            linger,
            strategy: None,
        }
    }

    /// Runs the loop until a stop strategy completes. Returns the strategy that ended it.
    ///
    /// On return (or if this future is dropped) the runtime token is cancelled and
    /// every submission still buffered is answered with `QueueStopped`.
    pub async fn run(mut self) -> Option<StopStrategy> {
        let _runtime_guard = self.runtime_token.clone().drop_guard();
        self.bus.publish(Event::new(EventKind::QueueStarted));

        loop {
            tokio::select! {
                biased;
                Some(strategy) = self.stops.recv() => {
                    if self.on_stop(strategy) {
                        break;
                    }
                }
                Some(retirement) = self.retired_rx.recv() => {
                    if self.on_retired(retirement) {
                        break;
                    }
                }
                Some(cmd) = self.commands.recv() => self.on_command(cmd),
                else => break,
            }
        }

        self.reject_pending();
        self.strategy
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit { job, reply } => {
                let res = self.submit(job);
                if let Some(reply) = reply {
                    let _ = reply.send(res);
                }
            }
            Command::Snapshot { reply } => {
                let mut keys: Vec<String> = self.directory.keys().map(|k| k.to_string()).collect();
                keys.sort_unstable();
                let _ = reply.send(keys);
            }
        }
    }

    /// Places `job` on the sequence for its key, creating one if needed.
    fn submit(&mut self, job: Job) -> Result<(), SubmitError> {
        let (key, priority, unique, action) = job.into_parts();
        let mut job = QueuedJob {
            priority,
            unique,
            action,
        };

        let existing = self.directory.get(&key).map(|h| Arc::clone(&h.sequence));
        if let Some(sequence) = existing {
            match sequence.enqueue(job) {
                Ok(()) => return Ok(()),
                Err(Refused {
                    reason: EnqueueError::Duplicate,
                    job,
                }) => return Err(duplicate(key, job)),
                Err(Refused {
                    reason: EnqueueError::Drained,
                    job: returned,
                }) => {
                    self.bus.publish(
                        Event::new(EventKind::DrainRaceRetried)
                            .with_key(Arc::clone(&key))
                            .with_sequence(sequence.id()),
                    );
                    self.remove(&key, sequence.id());
                    job = returned;
                }
            }
        }

        // Nothing can have raced on a sequence whose loop has not started yet.
        let sequence = Sequence::new(
            Arc::clone(&key),
            self.linger,
            self.bus.clone(),
            self.retired_tx.clone(),
        );
        self.bus.publish(
            Event::new(EventKind::SequenceCreated)
                .with_key(Arc::clone(&key))
                .with_sequence(sequence.id()),
        );
        let accepted = sequence.enqueue(job).map_err(|r| duplicate(Arc::clone(&key), r.job));
        self.start(key, sequence);
        accepted
    }

    /// Registers `sequence` under `key` and spawns its execution loop.
    fn start(&mut self, key: Arc<str>, sequence: Arc<Sequence>) {
        let cancel = self.runtime_token.child_token();
        tokio::spawn(Arc::clone(&sequence).run(cancel.clone()));
        self.directory.insert(key, Handle { sequence, cancel });
    }

    /// Handles a retirement report. Returns `true` when the loop should exit.
    fn on_retired(&mut self, retirement: Retirement) -> bool {
        self.remove(&retirement.key, retirement.id);
        self.strategy == Some(StopStrategy::Drain) && self.drained()
    }

    /// True once no sequence is live and no submission is buffered.
    ///
    /// Buffered commands are served first: a submission accepted by the channel
    /// before the loop exits must run, even if the drain would otherwise be done.
    fn drained(&mut self) -> bool {
        loop {
            if !self.directory.is_empty() {
                return false;
            }
            match self.commands.try_recv() {
                Ok(cmd) => self.on_command(cmd),
                Err(_) => return true,
            }
        }
    }

    /// Removes the entry for `key` only if it still belongs to sequence `id`.
    fn remove(&mut self, key: &Arc<str>, id: u64) {
        let owned = self
            .directory
            .get(key)
            .is_some_and(|h| h.sequence.id() == id);
        if !owned {
            return;
        }
        if let Some(handle) = self.directory.remove(key) {
            handle.sequence.terminate();
            self.bus.publish(
                Event::new(EventKind::SequenceRemoved)
                    .with_key(Arc::clone(key))
                    .with_sequence(id),
            );
        }
    }

    /// Handles a stop request. Returns `true` when the loop should exit.
    fn on_stop(&mut self, strategy: StopStrategy) -> bool {
        self.bus.publish(
            Event::new(EventKind::StopRequested)
                .with_strategy(strategy)
                .with_pending(self.directory.len()),
        );

        // An immediate stop overrides a drain in progress, never the reverse.
        if self.strategy != Some(StopStrategy::Immediate) {
            self.strategy = Some(strategy);
        }

        match self.strategy {
            Some(StopStrategy::Immediate) => {
                self.terminate_all();
                true
            }
            _ => self.drained(),
        }
    }

    /// Force-terminates every live sequence without waiting for in-flight actions.
    fn terminate_all(&mut self) {
        for (key, handle) in self.directory.drain() {
            handle.cancel.cancel();
            let abandoned = handle.sequence.terminate();
            self.bus.publish(
                Event::new(EventKind::SequenceTerminated)
                    .with_key(key)
                    .with_sequence(handle.sequence.id())
                    .with_pending(abandoned),
            );
        }
        self.runtime_token.cancel();
    }

    /// Closes the submission channel and answers everything still buffered.
    fn reject_pending(&mut self) {
        self.commands.close();
        while let Ok(cmd) = self.commands.try_recv() {
            let Command::Submit { job, reply } = cmd else {
                continue;
            };
            match reply {
                Some(reply) => {
                    let _ = reply.send(Err(SubmitError::QueueStopped));
                }
                None => self.bus.publish(
                    Event::new(EventKind::JobRejected)
                        .with_key(job.key())
                        .with_priority(job.priority())
                        .with_reason(SubmitError::QueueStopped.as_label()),
                ),
            }
        }
    }
}

fn duplicate(key: Arc<str>, job: QueuedJob) -> SubmitError {
    SubmitError::DuplicateRejected {
        key,
        unique: job.unique.unwrap_or_else(|| Arc::from("")),
    }
}
