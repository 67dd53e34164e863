//! One accumulation lane of the pool.

use super::channel::TaskReceiver;
use super::stats::AggregatorStats;
use super::trigger::FlushTrigger;
use crate::aggregation::Aggregation;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// The batch reached `batch_size` items.
    Size,
    /// `batch_interval` elapsed since the last reset.
    Timer,
    /// The aggregator is stopping; this is the worker's final flush.
    Shutdown,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Size => "size",
            FlushReason::Timer => "timer",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one flush to `after_act`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushInfo {
    /// Index of the worker in the pool, starting at 0.
    pub worker_id: usize,
    pub reason: FlushReason,
    /// Items folded into the flushed sum.
    pub count: usize,
}

enum Stimulus<T> {
    Item(T),
    Timer,
    Shutdown,
}

pub(crate) struct Worker<A: Aggregation> {
    id: usize,
    aggregation: Arc<A>,
    batch_size: usize,
    batch_interval: Duration,
    tasks: TaskReceiver<A::Item>,
    shutdown: CancellationToken,
    stats: Arc<AggregatorStats>,
    trigger: FlushTrigger,
    count: usize,
}

impl<A: Aggregation> Worker<A> {
    pub(crate) fn new(
        id: usize,
        aggregation: Arc<A>,
        batch_size: usize,
        batch_interval: Duration,
        tasks: TaskReceiver<A::Item>,
        shutdown: CancellationToken,
        stats: Arc<AggregatorStats>,
    ) -> Self {
        Self {
            id,
            aggregation,
            batch_size,
            batch_interval,
            tasks,
            shutdown,
            stats,
            trigger: FlushTrigger::new(batch_interval),
            count: 0,
        }
    }

    /// Event loop: accumulate until a size, timer or shutdown stimulus, flush,
    /// reset, repeat. Returns after the shutdown flush.
    pub(crate) async fn run(mut self) {
        let mut sum = self.aggregation.new_sum();
        debug!(worker_id = self.id, "worker started");

        loop {
            match self.next_stimulus().await {
                Stimulus::Item(item) => {
                    sum = self.aggregation.reduce(sum, item);
                    self.count += 1;
                    if self.count >= self.batch_size {
                        self.flush(sum, FlushReason::Size).await;
                        sum = self.reset(FlushReason::Size);
                    }
                }
                Stimulus::Timer => {
                    self.flush(sum, FlushReason::Timer).await;
                    sum = self.reset(FlushReason::Timer);
                }
                Stimulus::Shutdown => {
                    self.flush(sum, FlushReason::Shutdown).await;
                    self.reset(FlushReason::Shutdown);
                    break;
                }
            }
        }

        debug!(worker_id = self.id, "worker stopped");
    }

    /// Wait for exactly one stimulus. Shutdown wins ties; a closed channel
    /// counts as shutdown.
    ///
    /// With a zero interval the trigger is always due, so it only competes
    /// once the batch holds something: a partial batch flushes as soon as no
    /// item is waiting, and an idle worker does not spin on empty flushes.
    async fn next_stimulus(&mut self) -> Stimulus<A::Item> {
        let timer_enabled = !self.batch_interval.is_zero() || self.count > 0;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Stimulus::Shutdown,
            next = self.tasks.recv() => match next {
                Some(item) => Stimulus::Item(item),
                None => Stimulus::Shutdown,
            },
            _ = self.trigger.fired(), if timer_enabled => Stimulus::Timer,
        }
    }

    async fn flush(&self, sum: A::Sum, reason: FlushReason) {
        let info = FlushInfo {
            worker_id: self.id,
            reason,
            count: self.count,
        };
        self.stats.record_flush(reason);

        if let Err(e) = self.aggregation.before_act(&sum) {
            // The batch is dropped without reaching after_act.
            warn!(
                worker_id = self.id,
                reason = reason.as_str(),
                discarded = self.count,
                error = %e,
                "before_act rejected batch"
            );
            self.stats.record_veto();
            return;
        }

        let started = Instant::now();
        let result = self.aggregation.act(&sum).await;
        self.stats.record_action(self.count, result.is_ok());
        match &result {
            Ok(_) => debug!(
                worker_id = self.id,
                reason = reason.as_str(),
                count = self.count,
                duration_ms = started.elapsed().as_millis() as u64,
                "batch flushed"
            ),
            Err(e) => warn!(
                worker_id = self.id,
                reason = reason.as_str(),
                count = self.count,
                error = %e,
                "batch action failed"
            ),
        }

        self.aggregation.after_act(&info, sum, result);
    }

    /// Rearm the trigger, zero the counter and hand back a fresh sum.
    fn reset(&mut self, reason: FlushReason) -> A::Sum {
        self.trigger
            .reset(self.batch_interval, reason != FlushReason::Timer);
        self.count = 0;
        self.aggregation.new_sum()
    }
}
