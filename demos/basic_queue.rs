//! # Example: basic_queue
//!
//! Two keys, a handful of prioritised jobs, a rejected duplicate and a graceful stop.
//!
//! Demonstrates how to:
//! - Build [`Job`]s with a key, a priority and a unique token.
//! - Run the [`Queue`] on its own task with [`Queue::spawn`].
//! - Observe per-key ordering and cross-key parallelism.
//! - Drain every backlog with [`Queue::graceful_stop`].
//!
//! ## Flow
//! ```text
//! submit(Job "acct-1" ...) ──► Arbiter ──► Sequence "acct-1" ──► job, job, job
//! submit(Job "acct-2" ...) ──► Arbiter ──► Sequence "acct-2" ──► job, job
//! graceful_stop()          ──► Arbiter waits for both sequences to retire ──► exit
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_queue
//! ```

use std::time::Duration;

use keyqueue::{Job, Queue, QueueConfig, SubmitError, priority};

fn step(key: &'static str, label: &'static str, millis: u64) -> Job {
    Job::from_fn(key, move || async move {
        println!("[{key}] {label} started");
        tokio::time::sleep(Duration::from_millis(millis)).await;
        println!("[{key}] {label} done");
    })
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Defaults are fine: no linger, generous channel capacities
    let queue = Queue::new(QueueConfig::default());

    // 2. Drive the arbitration loop on its own task
    let runner = queue.spawn();

    // 3. The first job on a key starts right away; the rest queue up behind it
    queue.submit(step("acct-1", "open", 200)).await?;
    queue
        .submit(step("acct-1", "audit", 50).with_priority(priority::LOW))
        .await?;
    queue
        .submit(
            step("acct-1", "recalc", 50)
                .with_priority(priority::HIGH)
                .with_unique("recalc"),
        )
        .await?;

    // 4. Same token still waiting on the same key: rejected
    match queue
        .submit(step("acct-1", "recalc again", 50).with_unique("recalc"))
        .await
    {
        Err(SubmitError::DuplicateRejected { key, unique }) => {
            println!("[main] duplicate rejected: key={key} unique={unique}");
        }
        other => println!("[main] unexpected: {other:?}"),
    }

    // 5. Another key runs in parallel
    queue.submit(step("acct-2", "open", 100)).await?;
    queue.submit(step("acct-2", "close", 100)).await?;

    println!("[main] live sequences: {:?}", queue.sequences().await?);

    // 6. Run everything that is waiting, then exit
    queue.graceful_stop().await;
    runner.await??;
    println!("[main] queue stopped");
    Ok(())
}
