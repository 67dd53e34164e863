use super::channel::{self, TaskReceiver, TaskSender};
use super::stats::{AggregatorSnapshot, AggregatorStats};
use super::worker::Worker;
use crate::aggregation::Aggregation;
use crate::config::AggregatorConfig;
use crate::{Error, ErrorContext, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// Lifecycle of an [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatorState {
    Unstarted,
    Running,
    Stopping,
    Stopped,
}

struct Inner<A: Aggregation> {
    config: AggregatorConfig,
    aggregation: Arc<A>,
    sender: TaskSender<A::Item>,
    // Taken by the first `start`.
    receiver: Mutex<Option<TaskReceiver<A::Item>>>,
    shutdown: CancellationToken,
    stop_requested: AtomicBool,
    state: watch::Sender<AggregatorState>,
    stats: Arc<AggregatorStats>,
}

/// Handle to a worker pool. Clones share the same pool.
///
/// `start` runs the pool and only returns once it has fully stopped, so it is
/// usually driven on its own task (see [`Aggregator::spawn`]) while producers
/// call [`Aggregator::submit`] and some owner eventually calls
/// [`Aggregator::stop`].
///
/// Submitting after `stop` has been called is the caller's responsibility to
/// avoid: such an item is either folded into a final batch or rejected with
/// [`Error::Closed`].
pub struct Aggregator<A: Aggregation> {
    inner: Arc<Inner<A>>,
}

impl<A: Aggregation> Clone for Aggregator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Aggregation> Aggregator<A> {
    pub fn new(config: AggregatorConfig, aggregation: A) -> Self {
        let stats = Arc::new(AggregatorStats::default());
        let (sender, receiver) = channel::channel(Arc::clone(&stats));
        let (state, _) = watch::channel(AggregatorState::Unstarted);
        Self {
            inner: Arc::new(Inner {
                config,
                aggregation: Arc::new(aggregation),
                sender,
                receiver: Mutex::new(Some(receiver)),
                shutdown: CancellationToken::new(),
                stop_requested: AtomicBool::new(false),
                state,
                stats,
            }),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    pub fn aggregation(&self) -> &A {
        &self.inner.aggregation
    }

    pub fn state(&self) -> AggregatorState {
        *self.inner.state.borrow()
    }

    pub fn snapshot(&self) -> AggregatorSnapshot {
        self.inner.stats.snapshot()
    }

    /// A producer handle that does not keep the aggregator itself alive.
    pub fn sender(&self) -> TaskSender<A::Item> {
        self.inner.sender.clone()
    }

    /// Hand one item to the pool, waiting until a worker claims it.
    pub async fn submit(&self, item: A::Item) -> Result<()> {
        self.inner.sender.submit(item).await
    }

    /// Validate the configuration, spawn the workers and wait until all of them
    /// have made their shutdown flush.
    ///
    /// Configuration errors are returned immediately and leave the aggregator
    /// `Stopped`. A worker that panics inside a callback is not restarted; the
    /// rest of the pool keeps running and the panic is reported as
    /// [`Error::WorkerPanicked`] once the pool has stopped.
    pub async fn start(&self) -> Result<()> {
        if let Err(e) = self.inner.config.validate() {
            self.inner.state.send_replace(AggregatorState::Stopped);
            return Err(e);
        }

        let tasks = {
            let mut slot = self.inner.receiver.lock().map_err(|_| {
                Error::runtime_with_context(
                    "aggregator receiver lock poisoned",
                    ErrorContext::new().with_source("controller"),
                )
            })?;
            slot.take().ok_or(Error::AlreadyStarted)?
        };

        self.inner.state.send_modify(|state| {
            if *state == AggregatorState::Unstarted {
                *state = AggregatorState::Running;
            }
        });

        let config = &self.inner.config;
        info!(
            worker_count = config.worker_count,
            batch_size = config.batch_size,
            batch_interval_ms = config.batch_interval.as_millis() as u64,
            "aggregator started"
        );

        let mut workers = JoinSet::new();
        for id in 0..config.worker_count {
            let worker = Worker::new(
                id,
                Arc::clone(&self.inner.aggregation),
                config.batch_size,
                config.batch_interval,
                tasks.clone(),
                self.inner.shutdown.clone(),
                Arc::clone(&self.inner.stats),
            );
            workers.spawn(
                worker
                    .run()
                    .instrument(tracing::info_span!("aggregator_worker", worker_id = id)),
            );
        }
        // Only workers hold the receiver now; queued items are rejected once they exit.
        drop(tasks);

        let mut panicked = 0;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    panicked += 1;
                    error!(error = %e, "aggregator worker panicked");
                }
            }
        }

        self.inner.state.send_replace(AggregatorState::Stopped);
        info!("aggregator stopped");

        if panicked > 0 {
            return Err(Error::WorkerPanicked { count: panicked });
        }
        Ok(())
    }

    /// Run [`Aggregator::start`] on a new tokio task.
    pub fn spawn(&self) -> JoinHandle<Result<()>> {
        let this = self.clone();
        tokio::spawn(async move { this.start().await })
    }

    /// Broadcast shutdown and wait until every worker has flushed its final
    /// batch and exited.
    ///
    /// May only be called once; a second call fails with
    /// [`Error::AlreadyStopping`]. If the aggregator has not been started yet,
    /// this waits until `start` runs and drains.
    pub async fn stop(&self) -> Result<()> {
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStopping);
        }

        self.inner.state.send_if_modified(|state| match *state {
            AggregatorState::Unstarted | AggregatorState::Running => {
                *state = AggregatorState::Stopping;
                true
            }
            _ => false,
        });
        info!("aggregator stopping");
        self.inner.shutdown.cancel();

        let mut state = self.inner.state.subscribe();
        state
            .wait_for(|s| *s == AggregatorState::Stopped)
            .await
            .map_err(|_| {
                Error::runtime_with_context(
                    "aggregator state channel closed",
                    ErrorContext::new().with_source("controller"),
                )
            })?;
        Ok(())
    }
}
