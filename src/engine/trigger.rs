//! Restartable one-shot flush timer.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// Countdown that fires once per arming.
///
/// A firing that became due but was never observed stays *pending*: the next
/// call to [`FlushTrigger::fired`] completes immediately with it. Re-arming does
/// not clear it, so a reset that is not a response to the firing itself has to
/// go through [`FlushTrigger::reset`] with `drain_required = true`, or the stale
/// firing cuts the next interval short.
pub struct FlushTrigger {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
    pending: bool,
}

impl FlushTrigger {
    /// Create a trigger armed for `interval`. A zero interval makes it due at once.
    pub fn new(interval: Duration) -> Self {
        let mut trigger = Self {
            sleep: Box::pin(tokio::time::sleep(Duration::ZERO)),
            armed: false,
            pending: false,
        };
        trigger.arm(interval);
        trigger
    }

    /// Schedule one firing `interval` from now, replacing any scheduled one.
    pub fn arm(&mut self, interval: Duration) {
        self.sleep.as_mut().reset(Instant::now() + interval);
        self.armed = true;
    }

    /// Cancel the scheduled firing.
    ///
    /// Returns `true` if the trigger was stopped before it fired. Returns
    /// `false` if it was not armed, or if the deadline already passed, in
    /// which case the firing is left pending.
    pub fn stop(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        if self.sleep.deadline() <= Instant::now() {
            self.pending = true;
            return false;
        }
        true
    }

    /// Discard a pending firing, if any.
    pub fn drain(&mut self) {
        self.pending = false;
    }

    /// Stop, drain if required, then rearm.
    ///
    /// `drain_required` is `false` only when resetting in response to the
    /// trigger's own firing, which already consumed itself.
    pub fn reset(&mut self, interval: Duration, drain_required: bool) {
        if !self.stop() && drain_required {
            self.drain();
        }
        self.arm(interval);
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Completes when the trigger fires. Never completes while disarmed with
    /// nothing pending. Cancel-safe: dropping the future loses no firing.
    pub async fn fired(&mut self) {
        if self.pending {
            self.pending = false;
            return;
        }
        if !self.armed {
            return std::future::pending().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

impl std::fmt::Debug for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushTrigger")
            .field("deadline", &self.sleep.deadline())
            .field("armed", &self.armed)
            .field("pending", &self.pending)
            .finish()
    }
}
