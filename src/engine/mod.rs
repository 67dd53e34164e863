//! 批处理引擎模块：工作者池、刷新触发器与关闭协议。
//!
//! # Batching Engine
//!
//! A pool of workers that claim submitted items, fold them into a per-worker
//! sum and flush that sum when it reaches `batch_size` items or when
//! `batch_interval` elapses, whichever comes first.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Aggregator`] | Controller: starts the pool, accepts items, coordinates shutdown |
//! | [`TaskSender`] | Producer handle onto the unbuffered distribution channel |
//! | [`FlushTrigger`] | Restartable one-shot timer owned by a single worker |
//! | [`FlushInfo`] / [`FlushReason`] | What `after_act` learns about a flush |
//! | [`AggregatorSnapshot`] | Pool counters for observation |
//!
//! ## Worker lifecycle
//!
//! Each worker waits for one of three stimuli and services exactly one at a time:
//!
//! - **item**: `reduce` it into the sum; flush when the count reaches `batch_size`
//! - **timer**: flush whatever has accumulated, possibly nothing
//! - **shutdown**: flush once more, then exit
//!
//! Every flush runs `before_act`, `act` and `after_act`, then resets: the
//! trigger is rearmed (draining a stale firing unless the timer itself caused
//! the flush), the count is zeroed and a fresh sum comes from `new_sum`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use batch_aggregator::{Aggregator, AggregatorConfig, FnAggregation};
//! use std::time::Duration;
//!
//! # async fn run() -> batch_aggregator::Result<()> {
//! let aggregation = FnAggregation::<u64, u64, u64>::builder()
//!     .new_sum(|| 0)
//!     .reduce(|sum, item| sum + item)
//!     .action(|sum| Ok(*sum))
//!     .after_act(|info, _, total| println!("{} flush: {:?}", info.reason, total.ok()))
//!     .build()?;
//!
//! let config = AggregatorConfig::new()
//!     .with_worker_count(4)
//!     .with_batch_size(50)
//!     .with_batch_interval(Duration::from_millis(100));
//! let aggregator = Aggregator::new(config, aggregation);
//!
//! let running = aggregator.spawn();
//! for i in 0..1_000 {
//!     aggregator.submit(i).await?;
//! }
//! aggregator.stop().await?;
//! running.await.expect("aggregator task")?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod controller;
mod stats;
mod trigger;
mod worker;

pub use channel::TaskSender;
pub use controller::{Aggregator, AggregatorState};
pub use stats::AggregatorSnapshot;
pub use trigger::FlushTrigger;
pub use worker::{FlushInfo, FlushReason};
