//! # Example: logged_queue
//!
//! Attaches the built-in [`LogWriter`] subscriber and prints every runtime event
//! through `tracing_subscriber::fmt`.
//!
//! Shows:
//! - sequence creation, retirement and removal;
//! - a panicking job that does not stop its sequence;
//! - an immediate stop abandoning waiting work.
//!
//! ## Run
//! ```bash
//! RUST_LOG=keyqueue=trace cargo run --example logged_queue --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use keyqueue::{Job, LogWriter, Queue, QueueConfig, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keyqueue=debug")),
        )
        .init();

    let cfg = QueueConfig {
        linger: Duration::from_millis(50),
        ..QueueConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let queue = Queue::builder(cfg).with_subscribers(subs).build();
    let runner = queue.spawn();

    queue
        .submit(Job::from_fn("orders", || async {
            panic!("malformed order");
        }))
        .await?;
    queue
        .submit(Job::blocking("orders", || {
            std::thread::sleep(Duration::from_millis(20));
        }))
        .await?;

    // Let the first batch run and the sequence retire after its linger.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for i in 0..5 {
        queue
            .submit(Job::from_fn("reports", move || async move {
                tokio::time::sleep(Duration::from_millis(100 * i)).await;
            }))
            .await?;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.stop().await;
    runner.await??;
    Ok(())
}
