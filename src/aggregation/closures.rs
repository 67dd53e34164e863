//! Closure-backed [`Aggregation`].

use super::Aggregation;
use crate::engine::FlushInfo;
use crate::error::BoxError;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;

type NewSumFn<U> = Box<dyn Fn() -> U + Send + Sync>;
type ReduceFn<T, U> = Box<dyn Fn(U, T) -> U + Send + Sync>;
type BeforeActFn<U> = Box<dyn Fn(&U) -> std::result::Result<(), BoxError> + Send + Sync>;
type ActionFn<U, V> = Box<dyn Fn(&U) -> std::result::Result<V, BoxError> + Send + Sync>;
type AfterActFn<U, V> = Box<dyn Fn(&FlushInfo, U, std::result::Result<V, BoxError>) + Send + Sync>;

/// An [`Aggregation`] assembled from closures.
///
/// - `T`: item type
/// - `U`: sum type
/// - `V`: result type
///
/// The action runs synchronously on the worker task; implement [`Aggregation`]
/// directly when the sink needs to await.
pub struct FnAggregation<T, U, V> {
    new_sum: NewSumFn<U>,
    reduce: ReduceFn<T, U>,
    before_act: Option<BeforeActFn<U>>,
    action: ActionFn<U, V>,
    after_act: Option<AfterActFn<U, V>>,
}

impl<T, U, V> FnAggregation<T, U, V> {
    pub fn builder() -> FnAggregationBuilder<T, U, V> {
        FnAggregationBuilder::new()
    }
}

#[async_trait]
impl<T, U, V> Aggregation for FnAggregation<T, U, V>
where
    T: Send + 'static,
    U: Send + Sync + 'static,
    V: Send + 'static,
{
    type Item = T;
    type Sum = U;
    type Output = V;

    fn new_sum(&self) -> U {
        (self.new_sum)()
    }

    fn reduce(&self, sum: U, item: T) -> U {
        (self.reduce)(sum, item)
    }

    fn before_act(&self, sum: &U) -> std::result::Result<(), BoxError> {
        match &self.before_act {
            Some(guard) => guard(sum),
            None => Ok(()),
        }
    }

    async fn act(&self, sum: &U) -> std::result::Result<V, BoxError> {
        (self.action)(sum)
    }

    fn after_act(&self, info: &FlushInfo, sum: U, result: std::result::Result<V, BoxError>) {
        if let Some(observer) = &self.after_act {
            observer(info, sum, result);
        }
    }
}

/// Builder for [`FnAggregation`]. `new_sum`, `reduce` and `action` are required.
pub struct FnAggregationBuilder<T, U, V> {
    new_sum: Option<NewSumFn<U>>,
    reduce: Option<ReduceFn<T, U>>,
    before_act: Option<BeforeActFn<U>>,
    action: Option<ActionFn<U, V>>,
    after_act: Option<AfterActFn<U, V>>,
}

impl<T, U, V> FnAggregationBuilder<T, U, V> {
    pub fn new() -> Self {
        Self {
            new_sum: None,
            reduce: None,
            before_act: None,
            action: None,
            after_act: None,
        }
    }

    pub fn new_sum<F>(mut self, f: F) -> Self
    where
        F: Fn() -> U + Send + Sync + 'static,
    {
        self.new_sum = Some(Box::new(f));
        self
    }

    pub fn reduce<F>(mut self, f: F) -> Self
    where
        F: Fn(U, T) -> U + Send + Sync + 'static,
    {
        self.reduce = Some(Box::new(f));
        self
    }

    pub fn before_act<F>(mut self, f: F) -> Self
    where
        F: Fn(&U) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before_act = Some(Box::new(f));
        self
    }

    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&U) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        self.action = Some(Box::new(f));
        self
    }

    pub fn after_act<F>(mut self, f: F) -> Self
    where
        F: Fn(&FlushInfo, U, std::result::Result<V, BoxError>) + Send + Sync + 'static,
    {
        self.after_act = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<FnAggregation<T, U, V>> {
        let missing = |name: &str| {
            Error::configuration_with_context(
                format!("{} callback is required", name),
                ErrorContext::new()
                    .with_field_path(format!("aggregation.{}", name))
                    .with_source("aggregation_builder"),
            )
        };
        Ok(FnAggregation {
            new_sum: self.new_sum.ok_or_else(|| missing("new_sum"))?,
            reduce: self.reduce.ok_or_else(|| missing("reduce"))?,
            before_act: self.before_act,
            action: self.action.ok_or_else(|| missing("action"))?,
            after_act: self.after_act,
        })
    }
}

impl<T, U, V> Default for FnAggregationBuilder<T, U, V> {
    fn default() -> Self {
        Self::new()
    }
}
