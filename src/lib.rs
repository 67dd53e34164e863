//! # batch-aggregator
//!
//! 通用的并发批处理引擎：把高频的单条提交聚合成低频的批量操作。
//!
//! A generic batching engine. Many producers submit items one at a time; a pool
//! of workers folds them into per-worker sums and periodically turns each sum
//! into a result through a user-supplied action, when a batch fills up or when
//! a time interval elapses, whichever comes first.
//!
//! ## Overview
//!
//! The engine decouples high-frequency producers from a slow sink (a bulk
//! network call, a multi-key write) and trades a bounded amount of latency for
//! far fewer sink calls.
//!
//! - **Unbuffered handoff**: `submit` returns once a worker has claimed the item
//! - **Worker-owned state**: every sum, counter and timer lives in exactly one worker task
//! - **Size or time**: a batch flushes at `batch_size` items or after `batch_interval`
//! - **Drain on stop**: `stop` returns only after every worker flushed its last batch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_aggregator::{Aggregator, AggregatorConfig, FnAggregation};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> batch_aggregator::Result<()> {
//!     let aggregation = FnAggregation::<String, Vec<String>, usize>::builder()
//!         .new_sum(Vec::new)
//!         .reduce(|mut sum, item| {
//!             sum.push(item);
//!             sum
//!         })
//!         .action(|sum| Ok(sum.len()))
//!         .build()?;
//!
//!     let config = AggregatorConfig::new()
//!         .with_batch_size(20)
//!         .with_batch_interval(Duration::from_millis(100));
//!     let aggregator = Aggregator::new(config, aggregation);
//!     let running = aggregator.spawn();
//!
//!     aggregator.submit("hello".to_string()).await?;
//!     aggregator.stop().await?;
//!     running.await.expect("aggregator task")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregation`] | Callback contract (`new_sum`, `reduce`, `before_act`, `act`, `after_act`) |
//! | [`engine`] | Worker pool, flush trigger, distribution channel, controller |
//! | [`config`] | Pool sizing and timing, with serde and env overrides |
//! | [`telemetry`] | `tracing` subscriber setup |
//! | [`error`] | Error types |

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod telemetry;

pub use aggregation::{Aggregation, FnAggregation, FnAggregationBuilder};
pub use config::AggregatorConfig;
pub use engine::{
    Aggregator, AggregatorSnapshot, AggregatorState, FlushInfo, FlushReason, FlushTrigger,
    TaskSender,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{BoxError, Error, ErrorContext};
