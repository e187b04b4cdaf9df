//! Retry schedule shared by the WiFi and MQTT connect loops
//!
//! A policy answers two questions for a connect loop: how long to wait after
//! the n-th failed attempt, and whether the loop should give up.
//!
//! ```text
//! fixed(1s)                   1s ─► 1s ─► 1s ─► ...            (never gives up)
//! exponential(1s, 8s, 2.0, 5) 1s ─► 2s ─► 4s ─► 8s ─► Err
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays (1.0 keeps the delay fixed)
    pub multiplier: f64,
    /// Give up after this many failed attempts; `None` retries forever
    ///
    /// Every loop makes at least one attempt, so `Some(0)` behaves like
    /// `Some(1)`.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Constant delay, no attempt limit.
    ///
    /// Matches the classic boot loop of a microcontroller sketch: the caller
    /// blocks until the collaborator succeeds, however long that takes.
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
            max_attempts: None,
        }
    }

    pub fn exponential(
        initial: Duration,
        max: Duration,
        multiplier: f64,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            initial_delay_ms: initial.as_millis() as u64,
            max_delay_ms: max.as_millis() as u64,
            multiplier,
            max_attempts,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let raw = self.initial_delay_ms as f64 * factor;
        let capped = raw.min(self.max_delay_ms.max(self.initial_delay_ms) as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts >= max.max(1),
            None => false,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// Default schedule for WiFi association (2s initial, like the boot sketches)
    pub fn wifi_default() -> Self {
        Self::exponential(
            Duration::from_secs(2),
            Duration::from_secs(60),
            2.0,
            Some(10),
        )
    }

    /// Default schedule for broker connects (1s initial)
    pub fn mqtt_default() -> Self {
        Self::exponential(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
            Some(10),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::mqtt_default()
    }
}
