use super::worker::FlushReason;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorSnapshot {
    /// Items claimed by a worker.
    pub items_accepted: u64,
    /// Items covered by flushes that reached `act`.
    pub items_flushed: u64,
    pub size_flushes: u64,
    pub timer_flushes: u64,
    pub shutdown_flushes: u64,
    /// Flushes discarded by `before_act`.
    pub vetoed_flushes: u64,
    /// Flushes whose `act` returned an error.
    pub failed_actions: u64,
}

impl AggregatorSnapshot {
    pub fn total_flushes(&self) -> u64 {
        self.size_flushes + self.timer_flushes + self.shutdown_flushes
    }
}

/// Counters shared by the workers. Observational only.
#[derive(Debug, Default)]
pub(crate) struct AggregatorStats {
    items_accepted: AtomicU64,
    items_flushed: AtomicU64,
    size_flushes: AtomicU64,
    timer_flushes: AtomicU64,
    shutdown_flushes: AtomicU64,
    vetoed_flushes: AtomicU64,
    failed_actions: AtomicU64,
}

impl AggregatorStats {
    pub(crate) fn record_accepted(&self) {
        self.items_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a flush attempt, whatever its outcome.
    pub(crate) fn record_flush(&self, reason: FlushReason) {
        let counter = match reason {
            FlushReason::Size => &self.size_flushes,
            FlushReason::Timer => &self.timer_flushes,
            FlushReason::Shutdown => &self.shutdown_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_veto(&self) {
        self.vetoed_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_action(&self, count: usize, ok: bool) {
        self.items_flushed.fetch_add(count as u64, Ordering::Relaxed);
        if !ok {
            self.failed_actions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            items_accepted: self.items_accepted.load(Ordering::Relaxed),
            items_flushed: self.items_flushed.load(Ordering::Relaxed),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            timer_flushes: self.timer_flushes.load(Ordering::Relaxed),
            shutdown_flushes: self.shutdown_flushes.load(Ordering::Relaxed),
            vetoed_flushes: self.vetoed_flushes.load(Ordering::Relaxed),
            failed_actions: self.failed_actions.load(Ordering::Relaxed),
        }
    }
}
