//! Aggregator configuration.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizing and timing of the worker pool. Immutable once the aggregator starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Number of independent accumulation lanes.
    pub worker_count: usize,
    /// Item count that force-flushes a worker's batch.
    pub batch_size: usize,
    /// Maximum age of a partial batch before a time-triggered flush.
    /// With `Duration::ZERO` a partial batch is flushed as soon as no item is waiting.
    #[serde(rename = "batch_interval_ms", with = "duration_ms")]
    pub batch_interval: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            batch_size: 100,
            batch_interval: Duration::from_secs(1),
        }
    }
}

impl AggregatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_count(mut self, n: usize) -> Self {
        self.worker_count = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = interval;
        self
    }

    /// Defaults overridden by the environment.
    ///
    /// - `AGGREGATOR_WORKER_COUNT`
    /// - `AGGREGATOR_BATCH_SIZE`
    /// - `AGGREGATOR_BATCH_INTERVAL_MS`
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of `self`. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = std::env::var("AGGREGATOR_WORKER_COUNT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.worker_count = n;
        }
        if let Some(n) = std::env::var("AGGREGATOR_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.batch_size = n;
        }
        if let Some(ms) = std::env::var("AGGREGATOR_BATCH_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.batch_interval = Duration::from_millis(ms);
        }
        self
    }

    /// Parse a JSON document such as
    /// `{"worker_count": 4, "batch_size": 50, "batch_interval_ms": 250}`.
    /// Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::configuration_with_context(
                "invalid aggregator config",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count < 1 {
            return Err(Error::configuration_with_context(
                "worker_count must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.worker_count")
                    .with_details(format!("got {}", self.worker_count)),
            ));
        }
        if self.batch_size < 1 {
            return Err(Error::configuration_with_context(
                "batch_size must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.batch_size")
                    .with_details(format!("got {}", self.batch_size)),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.batch_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AggregatorConfig::new()
            .with_worker_count(5)
            .with_batch_size(20)
            .with_batch_interval(Duration::from_millis(100));
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.batch_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let err = AggregatorConfig::new()
            .with_worker_count(0)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("config.worker_count"));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let err = AggregatorConfig::new()
            .with_batch_size(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("batch_size must be at least 1"));
    }

    #[test]
    fn test_zero_interval_is_valid() {
        let config = AggregatorConfig::new().with_batch_interval(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            AggregatorConfig::from_json(r#"{"batch_size": 10, "batch_interval_ms": 10}"#).unwrap();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = AggregatorConfig::from_json(r#"{"batch_size": "ten"}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_json_round_trip_uses_millis() {
        let config = AggregatorConfig::new().with_batch_interval(Duration::from_millis(250));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["batch_interval_ms"], 250);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("AGGREGATOR_WORKER_COUNT", "3");
        std::env::set_var("AGGREGATOR_BATCH_SIZE", "not-a-number");
        std::env::set_var("AGGREGATOR_BATCH_INTERVAL_MS", "40");
        let config = AggregatorConfig::new().with_batch_size(7).with_env_overrides();
        std::env::remove_var("AGGREGATOR_WORKER_COUNT");
        std::env::remove_var("AGGREGATOR_BATCH_SIZE");
        std::env::remove_var("AGGREGATOR_BATCH_INTERVAL_MS");

        assert_eq!(config.worker_count, 3);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.batch_interval, Duration::from_millis(40));
    }
}
