//! Simple Aggregation Demo
//!
//! Ten producers submit integers concurrently. Five workers collect them and,
//! every 20 numbers or every 100ms, add their batch up.
//!
//! Usage:
//!   AGGREGATOR_LOG=debug cargo run --example simple

use batch_aggregator::{telemetry, Aggregator, AggregatorConfig, FnAggregation};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;

    let aggregation = FnAggregation::<u64, Vec<u64>, String>::builder()
        .new_sum(Vec::new)
        .reduce(|mut sum, item| {
            sum.push(item);
            sum
        })
        .before_act(|sum| {
            info!(len = sum.len(), "before act");
            Ok(())
        })
        .action(|sum| Ok(sum.iter().sum::<u64>().to_string()))
        .after_act(|flush, sum, result| match result {
            Ok(total) => info!(
                worker_id = flush.worker_id,
                reason = %flush.reason,
                items = sum.len(),
                total = total.as_str(),
                "group result"
            ),
            Err(e) => info!(worker_id = flush.worker_id, error = %e, "group failed"),
        })
        .build()?;

    let config = AggregatorConfig::new()
        .with_worker_count(5)
        .with_batch_size(20)
        .with_batch_interval(Duration::from_millis(100))
        .with_env_overrides();
    let aggregator = Aggregator::new(config, aggregation);
    let running = aggregator.spawn();

    let mut producers = Vec::new();
    for i in 0..10u64 {
        let sender = aggregator.sender();
        producers.push(tokio::spawn(async move {
            for j in 0..100u64 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                sender.submit(i + j).await?;
            }
            Ok::<_, batch_aggregator::Error>(())
        }));
    }
    for producer in producers {
        producer.await??;
    }

    aggregator.stop().await?;
    running.await??;

    let snap = aggregator.snapshot();
    println!(
        "accepted {} items in {} flushes",
        snap.items_accepted,
        snap.total_flushes()
    );
    Ok(())
}
