//! 日志与遥测模块：为引擎的 tracing 事件安装订阅者（可选）。
//!
//! Logging setup.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! application's decision. [`init_tracing`] is a convenience for binaries,
//! demos and tests.
//!
//! | Target | Level | Events |
//! |--------|-------|--------|
//! | controller | `info` | pool started / stopping / stopped |
//! | controller | `error` | a worker task panicked |
//! | worker | `debug` | worker start/stop, every successful flush |
//! | worker | `warn` | `before_act` vetoed a batch, `act` failed |

use crate::{Error, ErrorContext, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "AGGREGATOR_LOG";

/// Filter from `AGGREGATOR_LOG`, then `RUST_LOG`, then `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a global fmt subscriber filtered by [`env_filter`] with an `info` default.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .try_init()
        .map_err(|e| {
            Error::runtime_with_context(
                "failed to install tracing subscriber",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("telemetry"),
            )
        })
}
