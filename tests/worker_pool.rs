//! Multi-worker and multi-producer behaviour, with an async sink.

use async_trait::async_trait;
use batch_aggregator::{
    Aggregation, Aggregator, AggregatorConfig, BoxError, Error, FlushInfo, FlushReason,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Coalesces key/value writes into one bulk write per batch.
#[derive(Default)]
struct BulkWriter {
    write_latency: Duration,
    writes: Mutex<Vec<(usize, HashMap<String, u64>)>>,
    flushes: Mutex<Vec<FlushInfo>>,
}

#[async_trait]
impl Aggregation for BulkWriter {
    type Item = (String, u64);
    type Sum = HashMap<String, u64>;
    type Output = usize;

    fn new_sum(&self) -> HashMap<String, u64> {
        HashMap::new()
    }

    fn reduce(
        &self,
        mut sum: HashMap<String, u64>,
        (key, value): (String, u64),
    ) -> HashMap<String, u64> {
        sum.insert(key, value);
        sum
    }

    fn before_act(&self, sum: &HashMap<String, u64>) -> Result<(), BoxError> {
        if sum.is_empty() {
            return Err("nothing to write".into());
        }
        Ok(())
    }

    async fn act(&self, sum: &HashMap<String, u64>) -> Result<usize, BoxError> {
        if !self.write_latency.is_zero() {
            tokio::time::sleep(self.write_latency).await;
        }
        Ok(sum.len())
    }

    fn after_act(
        &self,
        info: &FlushInfo,
        sum: HashMap<String, u64>,
        result: Result<usize, BoxError>,
    ) {
        let written = result.unwrap_or_default();
        self.writes.lock().unwrap().push((info.worker_id, sum));
        self.flushes.lock().unwrap().push(info.clone());
        assert!(written > 0);
    }
}

fn config(workers: usize, batch_size: usize, interval: Duration) -> AggregatorConfig {
    AggregatorConfig::new()
        .with_worker_count(workers)
        .with_batch_size(batch_size)
        .with_batch_interval(interval)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_lose_nothing() {
    let agg = Aggregator::new(
        config(5, 20, Duration::from_millis(5)),
        BulkWriter::default(),
    );
    let running = agg.spawn();

    let mut producers = Vec::new();
    for p in 0..10u64 {
        let sender = agg.sender();
        producers.push(tokio::spawn(async move {
            for j in 0..100u64 {
                sender.submit((format!("k-{}-{}", p, j), p * 1000 + j)).await?;
            }
            Ok::<_, Error>(())
        }));
    }
    for producer in producers {
        producer.await.unwrap().unwrap();
    }
    agg.stop().await.unwrap();
    running.await.unwrap().unwrap();

    let writer = agg.aggregation();
    let writes = writer.writes.lock().unwrap();
    let mut keys = HashSet::new();
    for (_, batch) in writes.iter() {
        assert!(batch.len() <= 20);
        for key in batch.keys() {
            assert!(keys.insert(key.clone()), "{} written twice", key);
        }
    }
    assert_eq!(keys.len(), 1000);

    let workers: HashSet<usize> = writes.iter().map(|(id, _)| *id).collect();
    assert!(workers.iter().all(|id| *id < 5));

    let snap = agg.snapshot();
    assert_eq!(snap.items_accepted, 1000);
    assert_eq!(snap.items_flushed, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_later_writes_override_within_batch() {
    let agg = Aggregator::new(
        config(1, 3, Duration::from_secs(3600)),
        BulkWriter::default(),
    );
    let running = agg.spawn();

    agg.submit(("a".into(), 1)).await.unwrap();
    agg.submit(("b".into(), 2)).await.unwrap();
    agg.submit(("a".into(), 3)).await.unwrap();
    agg.stop().await.unwrap();
    running.await.unwrap().unwrap();

    let writes = agg.aggregation().writes.lock().unwrap().clone();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1.get("a"), Some(&3));
    assert_eq!(writes[0].1.len(), 2);
    // The empty shutdown batch was vetoed by before_act.
    assert_eq!(agg.snapshot().vetoed_flushes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_blocks_while_only_worker_flushes() {
    let agg = Aggregator::new(
        config(1, 2, Duration::from_secs(3600)),
        BulkWriter {
            write_latency: Duration::from_millis(100),
            ..Default::default()
        },
    );
    let running = agg.spawn();

    agg.submit(("a".into(), 1)).await.unwrap();
    agg.submit(("b".into(), 2)).await.unwrap();

    // The worker is inside a 100ms act; nobody can claim the next item.
    let blocked = {
        let sender = agg.sender();
        tokio::spawn(async move { sender.submit(("c".into(), 3)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(blocked.is_finished());
    blocked.await.unwrap().unwrap();

    agg.stop().await.unwrap();
    running.await.unwrap().unwrap();

    let flushes = agg.aggregation().flushes.lock().unwrap().clone();
    let reasons: Vec<_> = flushes.iter().map(|f| f.reason).collect();
    assert_eq!(reasons, vec![FlushReason::Size, FlushReason::Shutdown]);
    assert_eq!(flushes[1].count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_interval_measured_from_reset() {
    let agg = Aggregator::new(
        config(1, 100, Duration::from_millis(100)),
        BulkWriter {
            write_latency: Duration::from_millis(30),
            ..Default::default()
        },
    );
    let running = agg.spawn();
    let started = tokio::time::Instant::now();

    agg.submit(("a".into(), 1)).await.unwrap();
    // Timer flush at 100ms, act runs until 130ms, next deadline 230ms.
    tokio::time::sleep(Duration::from_millis(140)).await;
    agg.submit(("b".into(), 2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(agg.aggregation().writes.lock().unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(started.elapsed() >= Duration::from_millis(270));
    assert_eq!(agg.aggregation().writes.lock().unwrap().len(), 2);

    agg.stop().await.unwrap();
    running.await.unwrap().unwrap();
}
