use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keyqueue::{
    Bus, Event, EventKind, Job, Queue, QueueConfig, StopStrategy, Subscribe, SubmitError,
    SubscriberSet, priority,
};
use tokio::sync::{Notify, oneshot};

/// Job on `key` that signals `started` and then parks until `gate` is notified.
fn gate_job(key: &str, gate: Arc<Notify>) -> (Job, oneshot::Receiver<()>) {
    let (started_tx, started_rx) = oneshot::channel();
    let job = Job::from_fn(key, move || async move {
        let _ = started_tx.send(());
        gate.notified().await;
    });
    (job, started_rx)
}

fn record(key: &str, log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> Job {
    let log = Arc::clone(log);
    Job::from_fn(key, move || async move {
        log.lock().unwrap().push(label);
    })
}

fn counting(key: &str, hits: &Arc<AtomicUsize>) -> Job {
    let hits = Arc::clone(hits);
    Job::from_fn(key, move || async move {
        hits.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_runs_in_priority_then_arrival_order() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    // Hold the sequence busy so all three wait together.
    let (blocker, started) = gate_job("A", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();

    queue
        .submit(record("A", &log, "first").with_priority(2))
        .await
        .unwrap();
    queue
        .submit(record("A", &log, "second").with_priority(1))
        .await
        .unwrap();
    queue
        .submit(record("A", &log, "third").with_priority(2))
        .await
        .unwrap();

    gate.notify_one();
    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();

    assert_eq!(*log.lock().unwrap(), ["second", "first", "third"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiting_unique_token_rejects_duplicate() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let (blocker, started) = gate_job("A", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();

    let recalc = || {
        counting("A", &hits)
            .with_priority(priority::LOW)
            .with_unique("recalc")
    };
    queue.submit(recalc()).await.unwrap();
    let err = queue.submit(recalc()).await.unwrap_err();
    assert_eq!(
        err,
        SubmitError::DuplicateRejected {
            key: Arc::from("A"),
            unique: Arc::from("recalc"),
        }
    );

    // Same token on another key is independent.
    queue
        .submit(counting("B", &hits).with_unique("recalc"))
        .await
        .unwrap();

    gate.notify_one();
    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unique_token_accepted_again_once_running() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    // The running job holds the token but no longer waits.
    let (blocker, started) = gate_job("A", Arc::clone(&gate));
    queue.submit(blocker.with_unique("recalc")).await.unwrap();
    started.await.unwrap();

    queue
        .submit(counting("A", &hits).with_unique("recalc"))
        .await
        .unwrap();

    gate.notify_one();
    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_keys_run_in_parallel_but_each_key_sequentially() {
    const JOBS: usize = 100;

    #[derive(Default)]
    struct Gauge {
        running: [AtomicUsize; 2],
        max_per_key: AtomicUsize,
        both_running: AtomicUsize,
        done: AtomicUsize,
    }

    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gauge = Arc::new(Gauge::default());

    for i in 0..JOBS {
        for (slot, key) in ["A", "B"].into_iter().enumerate() {
            let g = Arc::clone(&gauge);
            queue
                .submit(
                    Job::from_fn(key, move || async move {
                        let now = g.running[slot].fetch_add(1, Ordering::SeqCst) + 1;
                        g.max_per_key.fetch_max(now, Ordering::SeqCst);
                        if g.running[1 - slot].load(Ordering::SeqCst) > 0 {
                            g.both_running.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        g.running[slot].fetch_sub(1, Ordering::SeqCst);
                        g.done.fetch_add(1, Ordering::SeqCst);
                    })
                    .with_priority(i as i64),
                )
                .await
                .unwrap();
        }
    }

    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();

    assert_eq!(gauge.done.load(Ordering::SeqCst), 2 * JOBS);
    assert_eq!(gauge.max_per_key.load(Ordering::SeqCst), 1);
    assert!(gauge.both_running.load(Ordering::SeqCst) > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submission_racing_retirement_runs_exactly_once() {
    const ROUNDS: usize = 200;

    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..ROUNDS {
        let (done_tx, done_rx) = oneshot::channel();
        let h = Arc::clone(&hits);
        queue
            .submit(Job::from_fn("C", move || async move {
                h.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.send(());
            }))
            .await
            .unwrap();
        // The next submission lands while the sequence is finding its backlog empty.
        done_rx.await.unwrap();
    }

    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), ROUNDS);
    assert!(queue.is_stopped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_graceful_stop_runs_every_queued_job() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let (blocker, started) = gate_job("D", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();
    for _ in 0..5 {
        queue.submit(counting("D", &hits)).await.unwrap();
    }

    let release = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            gate.notify_one();
        })
    };

    queue.graceful_stop().await;
    assert_eq!(hits.load(Ordering::SeqCst), 5);
    assert!(queue.is_stopped());

    release.await.unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_graceful_stop_accepts_late_submissions() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let (blocker, started) = gate_job("D", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();

    let stopper = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.stop_with(StopStrategy::Drain).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!stopper.is_finished());

    // Still draining: new work is accepted and run before exit.
    queue.submit(counting("D", &hits)).await.unwrap();
    queue.submit(counting("E", &hits)).await.unwrap();

    gate.notify_one();
    stopper.await.unwrap();
    runner.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_immediate_stop_abandons_waiting_jobs() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let (blocker, started) = gate_job("E", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();
    for _ in 0..3 {
        queue.submit(counting("E", &hits)).await.unwrap();
    }

    // Returns without waiting for the in-flight job.
    queue.stop().await;
    runner.await.unwrap().unwrap();
    assert!(queue.is_stopped());

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(
        queue.submit(counting("E", &hits)).await,
        Err(SubmitError::QueueStopped)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_immediate_stop_overrides_pending_drain() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let gate = Arc::new(Notify::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let (blocker, started) = gate_job("F", Arc::clone(&gate));
    queue.submit(blocker).await.unwrap();
    started.await.unwrap();
    queue.submit(counting("F", &hits)).await.unwrap();

    let draining = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.graceful_stop().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue.stop().await;
    draining.await.unwrap();
    runner.await.unwrap().unwrap();

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_job_does_not_halt_sequence() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let hits = Arc::new(AtomicUsize::new(0));

    queue
        .submit(Job::from_fn("P", || async { panic!("async boom") }))
        .await
        .unwrap();
    queue
        .submit(Job::blocking("P", || panic!("blocking boom")))
        .await
        .unwrap();
    queue.submit(counting("P", &hits)).await.unwrap();

    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_linger_keeps_sequence_alive_between_bursts() {
    let cfg = QueueConfig {
        linger: Duration::from_millis(200),
        ..QueueConfig::default()
    };
    let queue = Queue::new(cfg);
    let runner = queue.spawn();
    let mut events = queue.subscribe();
    let hits = Arc::new(AtomicUsize::new(0));

    queue.submit(counting("L", &hits)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(queue.sequences().await.unwrap(), ["L"]);
    queue.submit(counting("L", &hits)).await.unwrap();

    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let mut created = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::SequenceCreated {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handle_submits_from_other_tasks() {
    let queue = Queue::new(QueueConfig::default());
    let runner = queue.spawn();
    let hits = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let handle = queue.handle();
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                for _ in 0..10 {
                    handle
                        .submit(counting(&format!("producer-{}", p % 3), &hits))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.await.unwrap();
    }

    queue.graceful_stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 80);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscribers_see_job_lifecycle() {
    #[derive(Default)]
    struct Tally {
        completed: AtomicUsize,
        panicked: AtomicUsize,
        stopped: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Subscribe for Tally {
        async fn on_event(&self, ev: &Event) {
            let slot = match ev.kind {
                EventKind::JobCompleted => &self.completed,
                EventKind::JobPanicked => &self.panicked,
                EventKind::QueueStopped => &self.stopped,
                _ => return,
            };
            slot.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "tally"
        }
    }

    let tally = Arc::new(Tally::default());
    let queue = Queue::builder(QueueConfig::default())
        .with_subscribers(vec![tally.clone() as Arc<dyn Subscribe>])
        .build();
    let runner = queue.spawn();

    for key in ["x", "y", "x"] {
        queue
            .submit(Job::from_fn(key, || async {}))
            .await
            .unwrap();
    }
    queue
        .submit(Job::from_fn("y", || async { panic!("nope") }))
        .await
        .unwrap();

    queue.graceful_stop().await;
    // Subscribers are flushed before run() returns.
    runner.await.unwrap().unwrap();

    assert_eq!(tally.completed.load(Ordering::SeqCst), 3);
    assert_eq!(tally.panicked.load(Ordering::SeqCst), 1);
    assert_eq!(tally.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscriber_set_built_outside_the_queue() {
    struct Keys(Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl Subscribe for Keys {
        async fn on_event(&self, ev: &Event) {
            if let Some(key) = ev.key.as_deref() {
                self.0.lock().unwrap().push(key.to_owned());
            }
        }
    }

    let keys = Arc::new(Keys(Mutex::new(Vec::new())));
    let set = SubscriberSet::new(vec![keys.clone() as Arc<dyn Subscribe>], Bus::new(16));
    set.emit(&Event::new(EventKind::JobCompleted).with_key("a"));
    set.emit(&Event::new(EventKind::JobCompleted).with_key("b"));
    set.shutdown().await;

    assert_eq!(*keys.0.lock().unwrap(), ["a", "b"]);
}
