//! Bulk Write Demo
//!
//! Coalesces single key/value sets into one multi-key write per batch, the way a
//! cache client would turn many `SET`s into one `MSET`. A semaphore stands in for
//! a small connection pool, and the write itself is awaited inside `act`.
//!
//! Usage:
//!   cargo run --example mset

use async_trait::async_trait;
use batch_aggregator::{
    telemetry, Aggregation, Aggregator, AggregatorConfig, BoxError, FlushInfo,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

struct Item {
    key: String,
    val: String,
}

struct MsetWriter {
    pool: Arc<Semaphore>,
}

impl MsetWriter {
    async fn mset(&self, kv: Vec<(&str, &str)>) -> Result<(), BoxError> {
        let _conn = self.pool.acquire().await?;
        // Pretend round trip.
        tokio::time::sleep(Duration::from_millis(1)).await;
        debug!(keys = kv.len(), first = ?kv.first(), "MSET");
        Ok(())
    }
}

#[async_trait]
impl Aggregation for MsetWriter {
    type Item = Item;
    type Sum = HashMap<String, String>;
    type Output = usize;

    fn new_sum(&self) -> Self::Sum {
        HashMap::new()
    }

    fn reduce(&self, mut sum: Self::Sum, item: Item) -> Self::Sum {
        sum.insert(item.key, item.val);
        sum
    }

    async fn act(&self, sum: &Self::Sum) -> Result<usize, BoxError> {
        let kv = sum.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.mset(kv).await?;
        Ok(sum.len())
    }

    fn after_act(&self, info: &FlushInfo, sum: Self::Sum, result: Result<usize, BoxError>) {
        match result {
            Ok(n) => info!(reason = %info.reason, len = sum.len(), written = n, "mset done"),
            Err(e) => warn!(reason = %info.reason, len = sum.len(), error = %e, "mset failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;

    let writer = MsetWriter {
        pool: Arc::new(Semaphore::new(1)),
    };
    let config = AggregatorConfig::new()
        .with_worker_count(1)
        .with_batch_size(10)
        .with_batch_interval(Duration::from_millis(10));
    let aggregator = Aggregator::new(config, writer);
    let running = aggregator.spawn();

    let mut producers = Vec::new();
    for i in 0..100 {
        let sender = aggregator.sender();
        producers.push(tokio::spawn(async move {
            for j in 0..100 {
                tokio::time::sleep(Duration::from_millis(2)).await;
                let key = format!("{}{}", i, j);
                sender
                    .submit(Item {
                        val: key.clone(),
                        key,
                    })
                    .await?;
            }
            Ok::<_, batch_aggregator::Error>(())
        }));
    }
    for producer in producers {
        producer.await??;
    }

    aggregator.stop().await?;
    running.await??;
    info!(stats = ?aggregator.snapshot(), "all writes flushed");
    Ok(())
}
