use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use sluice_core::Limiter;

#[tokio::main]
async fn main() {
    // (A) logging: RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (B) concurrency cap from the first argument (default: 2)
    let limit: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(2);

    let mut limiter = match Limiter::<String, String>::new(limit) {
        Ok(limiter) => limiter,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    tracing::info!(limit, "limiter ready");

    // (C) submit a batch of sample tasks; every third one fails
    for i in 0..8u64 {
        limiter
            .submit(async move {
                sleep(Duration::from_millis(50 + i * 20)).await;
                if i % 3 == 2 {
                    Err(format!("task {i} hit a simulated failure"))
                } else {
                    Ok(format!("task {i} done"))
                }
            })
            .await;
        tracing::debug!(in_flight = limiter.counts().in_flight, "submitted");
    }

    // (D) wait for the whole batch and print the partition
    let settlement = limiter.settle().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&settlement).expect("settlement serializes")
    );
}
