//! # Sequence: per-key ordered backlog with its own execution loop.
//!
//! A sequence holds the waiting jobs of one key in priority order and runs them
//! one at a time on its own task. When it finds the backlog empty it retires:
//! it stops accepting jobs and reports back to the arbitration loop.
//!
//! ## State machine
//! ```text
//!   Active ──(backlog empty in loop)──► Draining ──(report handled)──► Terminated
//!      │                                   │
//!      └──────────(immediate stop)─────────┴──────────────────────────► Terminated
//! ```
//! There is no way back: a key that needs work after draining gets a brand-new
//! sequence. `enqueue` on a non-`Active` sequence returns `Drained` and hands the
//! job back so the arbiter can place it on the fresh one.
//!
//! ## Execution loop
//! ```text
//! loop {
//!   ├─► runtime token cancelled?        → exit (no report)
//!   ├─► lock; pop head; unlock
//!   │     ├─ Some(job) → run_job(job).await   (on this task, lock released)
//!   │     ├─ None + linger → wait(notify | linger elapsed | cancel), loop
//!   │     └─ None          → state = Draining (under lock), leave loop
//! }
//! publish SequenceDrained; send Retirement { key, id }
//! ```
//!
//! ## Rules
//! - The lock covers insert/pop/state only; an action never runs under it, so a
//!   long action never blocks `enqueue` for the same key.
//! - Jobs of one sequence never overlap: the next pop happens after the action returns.
//! - Duplicate detection only looks at **waiting** jobs, not the one running.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        backlog::{Backlog, QueuedJob},
        runner::run_job,
    },
    error::EnqueueError,
    events::{Bus, Event, EventKind},
};

/// Process-wide counter for sequence instance ids.
static SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SequenceState {
    /// Accepts and runs jobs.
    Active,
    /// Backlog found empty; about to report (or reporting) its retirement.
    Draining,
    /// Removed from the directory or force-stopped; must be treated as gone.
    Terminated,
}

/// Retirement report sent to the arbitration loop.
#[derive(Debug, Clone)]
pub(crate) struct Retirement {
    pub key: Arc<str>,
    pub id: u64,
}

/// Job handed back by a refused `enqueue`.
pub(crate) struct Refused {
    pub reason: EnqueueError,
    pub job: QueuedJob,
}

struct Inner {
    backlog: Backlog,
    state: SequenceState,
}

/// What the loop does next, decided under the lock.
enum Step {
    Run(QueuedJob, usize),
    Linger(Duration),
    Retire,
    Stop,
}

/// Ordered backlog and execution loop for one sequence key.
pub(crate) struct Sequence {
    key: Arc<str>,
    id: u64,
    inner: Mutex<Inner>,
    /// Wakes a lingering loop when a job arrives.
    arrived: Notify,
    linger: Option<Duration>,
    bus: Bus,
    report: mpsc::UnboundedSender<Retirement>,
}

impl Sequence {
    /// Creates an `Active` sequence with an empty backlog. The loop is not started.
    pub fn new(
        key: Arc<str>,
        linger: Option<Duration>,
        bus: Bus,
        report: mpsc::UnboundedSender<Retirement>,
    ) -> Arc<Self> {
        Arc::new(Self {
            key,
            id: SEQUENCE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            inner: Mutex::new(Inner {
                backlog: Backlog::new(),
                state: SequenceState::Active,
            }),
            arrived: Notify::new(),
            linger,
            bus,
            report,
        })
    }

    #[cfg(test)]
    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    #[cfg(test)]
    pub fn state(&self) -> SequenceState {
        self.lock().state
    }

    /// Inserts a job in priority order.
    ///
    /// Refuses with `Duplicate` if the unique token is already waiting, and with
    /// `Drained` once the sequence has left `Active`. The job is handed back on refusal.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), Refused> {
        let mut inner = self.lock();

        if inner.state != SequenceState::Active {
            return Err(Refused {
                reason: EnqueueError::Drained,
                job,
            });
        }

        if let Some(unique) = job.unique.as_deref() {
            if inner.backlog.contains_unique(unique) {
                drop(inner);
                self.bus.publish(
                    Event::new(EventKind::JobRejected)
                        .with_key(Arc::clone(&self.key))
                        .with_sequence(self.id)
                        .with_priority(job.priority)
                        .with_unique(job.unique.as_ref())
                        .with_reason(EnqueueError::Duplicate.as_label()),
                );
                return Err(Refused {
                    reason: EnqueueError::Duplicate,
                    job,
                });
            }
        }

        let priority = job.priority;
        let unique = job.unique.clone();
        inner.backlog.insert(job);
        let pending = inner.backlog.len();
        drop(inner);

        self.arrived.notify_one();
        self.bus.publish(
            Event::new(EventKind::JobEnqueued)
                .with_key(Arc::clone(&self.key))
                .with_sequence(self.id)
                .with_priority(priority)
                .with_unique(unique.as_ref())
                .with_pending(pending),
        );
        Ok(())
    }

    /// Marks the sequence `Terminated` and discards its waiting jobs.
    ///
    /// Returns how many waiting jobs were abandoned. Idempotent.
    pub fn terminate(&self) -> usize {
        let mut inner = self.lock();
        inner.state = SequenceState::Terminated;
        inner.backlog.clear()
    }

    /// Execution loop. Runs until the backlog drains or `token` is cancelled.
    ///
    /// Reports retirement only on a natural drain; a cancelled sequence exits silently.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut may_linger = true;

        loop {
            if token.is_cancelled() {
                self.terminate();
                return;
            }

            match self.next_step(may_linger) {
                Step::Run(job, pending) => {
                    run_job(&self.bus, &self.key, self.id, job, pending).await;
                    may_linger = true;
                }
                Step::Linger(linger) => {
                    tokio::select! {
                        _ = self.arrived.notified() => {}
                        _ = tokio::time::sleep(linger) => { may_linger = false; }
                        _ = token.cancelled() => {}
                    }
                }
                Step::Retire => break,
                Step::Stop => return,
            }
        }

        self.bus.publish(
            Event::new(EventKind::SequenceDrained)
                .with_key(Arc::clone(&self.key))
                .with_sequence(self.id),
        );
        let _ = self.report.send(Retirement {
            key: Arc::clone(&self.key),
            id: self.id,
        });
    }

    /// Pops the head or decides to linger/retire, all under one lock.
    fn next_step(&self, may_linger: bool) -> Step {
        let mut inner = self.lock();
        if inner.state != SequenceState::Active {
            return Step::Stop;
        }
        if let Some(job) = inner.backlog.shift() {
            let pending = inner.backlog.len();
            return Step::Run(job, pending);
        }
        match self.linger {
            Some(linger) if may_linger => Step::Linger(linger),
            _ => {
                inner.state = SequenceState::Draining;
                Step::Retire
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Critical sections never leave the backlog half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::jobs::{ActionFn, ActionRef};

    fn queued(priority: i64, unique: Option<&str>, action: ActionRef) -> QueuedJob {
        QueuedJob {
            priority,
            unique: unique.map(Arc::from),
            action,
        }
    }

    fn noop() -> ActionRef {
        ActionFn::boxed(|| async {})
    }

    fn sequence(linger: Option<Duration>) -> (Arc<Sequence>, mpsc::UnboundedReceiver<Retirement>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Sequence::new(Arc::from("k"), linger, Bus::new(64), tx), rx)
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = sequence(None);
        let (b, _rb) = sequence(None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.key().as_ref(), "k");
    }

    #[test]
    fn test_duplicate_rejected_and_job_returned() {
        let (seq, _rx) = sequence(None);
        assert!(seq.enqueue(queued(3, Some("recalc"), noop())).is_ok());

        let refused = seq
            .enqueue(queued(5, Some("recalc"), noop()))
            .err()
            .expect("duplicate must be refused");
        assert_eq!(refused.reason, EnqueueError::Duplicate);
        assert_eq!(refused.job.priority, 5);

        assert!(seq.enqueue(queued(3, Some("other"), noop())).is_ok());
        assert!(seq.enqueue(queued(3, None, noop())).is_ok());
        assert!(seq.enqueue(queued(3, None, noop())).is_ok());
    }

    #[test]
    fn test_enqueue_after_terminate_is_drained() {
        let (seq, _rx) = sequence(None);
        seq.enqueue(queued(1, None, noop())).ok();
        seq.enqueue(queued(1, None, noop())).ok();

        assert_eq!(seq.terminate(), 2);
        assert_eq!(seq.state(), SequenceState::Terminated);

        let refused = seq.enqueue(queued(1, None, noop())).err().expect("refused");
        assert_eq!(refused.reason, EnqueueError::Drained);
    }

    #[tokio::test]
    async fn test_runs_in_priority_order_then_retires() {
        let (seq, mut rx) = sequence(None);
        let order = Arc::new(Mutex::new(Vec::new()));

        for (tag, prio) in [("a", 2), ("b", 1), ("c", 2), ("d", 0)] {
            let order = Arc::clone(&order);
            let action = ActionFn::boxed(move || async move {
                order.lock().unwrap().push(tag);
            });
            seq.enqueue(queued(prio, None, action)).ok();
        }

        tokio::spawn(Arc::clone(&seq).run(CancellationToken::new()));
        let report = rx.recv().await.expect("retirement");

        assert_eq!(report.id, seq.id());
        assert_eq!(*order.lock().unwrap(), vec!["d", "b", "a", "c"]);
        assert_eq!(seq.state(), SequenceState::Draining);
        let refused = seq.enqueue(queued(1, None, noop())).err().expect("refused");
        assert_eq!(refused.reason, EnqueueError::Drained);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_halt_sequence() {
        let (seq, mut rx) = sequence(None);
        let hits = Arc::new(AtomicUsize::new(0));

        seq.enqueue(queued(1, None, ActionFn::boxed(|| async { panic!("first") })))
            .ok();
        let h = Arc::clone(&hits);
        seq.enqueue(queued(
            2,
            None,
            ActionFn::boxed(move || async move {
                h.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        ))
        .ok();

        tokio::spawn(Arc::clone(&seq).run(CancellationToken::new()));
        rx.recv().await.expect("retirement");
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_sequence_does_not_report() {
        let (seq, mut rx) = sequence(None);
        let token = CancellationToken::new();
        token.cancel();
        seq.enqueue(queued(1, None, noop())).ok();

        Arc::clone(&seq).run(token).await;
        assert_eq!(seq.state(), SequenceState::Terminated);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_linger_absorbs_late_job() {
        let (seq, mut rx) = sequence(Some(Duration::from_millis(200)));
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        seq.enqueue(queued(
            1,
            None,
            ActionFn::boxed(move || async move {
                h.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        ))
        .ok();
        tokio::spawn(Arc::clone(&seq).run(CancellationToken::new()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seq.state(), SequenceState::Active);

        let h = Arc::clone(&hits);
        assert!(
            seq.enqueue(queued(
                1,
                None,
                ActionFn::boxed(move || async move {
                    h.fetch_add(1, AtomicOrdering::SeqCst);
                }),
            ))
            .is_ok()
        );

        rx.recv().await.expect("retirement after linger");
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 2);
    }
}
