//! 聚合回调模块：定义批处理引擎与业务代码之间的回调契约。
//!
//! # Aggregation Callbacks
//!
//! The engine is agnostic to what it aggregates. Everything domain-specific is
//! supplied through the [`Aggregation`] trait: how a fresh sum is built, how an
//! item is folded into it, and what happens when a batch is flushed.
//!
//! | Callback | Required | Called |
//! |----------|----------|--------|
//! | [`Aggregation::new_sum`] | yes | at worker start and after every flush |
//! | [`Aggregation::reduce`] | yes | once per claimed item |
//! | [`Aggregation::before_act`] | no | before `act`; an `Err` discards the batch |
//! | [`Aggregation::act`] | yes | once per flush that passed `before_act` |
//! | [`Aggregation::after_act`] | no | after every `act`, success or failure |
//!
//! Implement the trait directly when the sink is async (a bulk network call),
//! or build an [`FnAggregation`] from plain closures.
//!
//! ## Example
//!
//! ```rust
//! use batch_aggregator::aggregation::FnAggregation;
//!
//! let summing = FnAggregation::<i64, Vec<i64>, i64>::builder()
//!     .new_sum(Vec::new)
//!     .reduce(|mut sum, item| {
//!         sum.push(item);
//!         sum
//!     })
//!     .action(|sum| Ok(sum.iter().sum()))
//!     .build()
//!     .unwrap();
//! # let _ = summing;
//! ```
//!
//! Callbacks run on the worker's task. A panic inside one is not caught and
//! terminates that worker; protect fallible observers yourself.

mod closures;

pub use closures::{FnAggregation, FnAggregationBuilder};

use crate::engine::FlushInfo;
use crate::error::BoxError;
use async_trait::async_trait;

/// Domain callbacks driven by the worker pool.
///
/// - `Item`: what producers submit
/// - `Sum`: the per-worker intermediate aggregate, opaque to the engine
/// - `Output`: what `act` turns a sum into
#[async_trait]
pub trait Aggregation: Send + Sync + 'static {
    type Item: Send + 'static;
    type Sum: Send + Sync + 'static;
    type Output: Send + 'static;

    /// Produce an empty accumulator.
    fn new_sum(&self) -> Self::Sum;

    /// Fold one item into the accumulator and return the updated value.
    fn reduce(&self, sum: Self::Sum, item: Self::Item) -> Self::Sum;

    /// Guard run before `act`. Returning `Err` vetoes the flush: neither `act`
    /// nor `after_act` runs and the batch is dropped.
    fn before_act(&self, _sum: &Self::Sum) -> Result<(), BoxError> {
        Ok(())
    }

    /// Convert the accumulator into a final result.
    async fn act(&self, sum: &Self::Sum) -> Result<Self::Output, BoxError>;

    /// Observe the outcome of a flush. This is the only place `act` failures surface.
    fn after_act(
        &self,
        _info: &FlushInfo,
        _sum: Self::Sum,
        _result: Result<Self::Output, BoxError>,
    ) {
    }
}
