//! # Sampling Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds of one sampling call.
///
/// A call never waits longer than `window_ms + grace_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Collection window, in ms.
    pub window_ms: u64,
    /// Extra wait for a first sample when the window stayed empty, in ms.
    pub grace_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            window_ms: 1_000,
            grace_ms: 2_000,
        }
    }
}

impl SamplingConfig {
    /// Short window for tests.
    pub fn for_testing() -> Self {
        Self {
            window_ms: 100,
            grace_ms: 50,
        }
    }

    /// Window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Grace as a duration.
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Hard ceiling of one call.
    pub fn ceiling_ms(&self) -> u64 {
        self.window_ms.saturating_add(self.grace_ms)
    }
}

/// When a tracking task takes its next reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum TrackingTrigger {
    /// Every `period_ms`.
    Interval { period_ms: u64 },
    /// Sample GPS every `poll_ms`, emit only after moving `min_distance_m`
    /// from the last emitted fix.
    Movement { poll_ms: u64, min_distance_m: f64 },
}

impl TrackingTrigger {
    /// Time between sampling attempts.
    pub fn period(&self) -> Duration {
        match *self {
            TrackingTrigger::Interval { period_ms } => Duration::from_millis(period_ms.max(1)),
            TrackingTrigger::Movement { poll_ms, .. } => Duration::from_millis(poll_ms.max(1)),
        }
    }
}

/// Tracking task settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// When to take the next sample.
    pub trigger: TrackingTrigger,
    /// Readings buffered before the task waits on the consumer.
    pub channel_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            trigger: TrackingTrigger::Interval { period_ms: 30_000 },
            channel_capacity: 64,
        }
    }
}

impl TrackingConfig {
    /// Fast periodic trigger for tests.
    pub fn for_testing() -> Self {
        Self {
            trigger: TrackingTrigger::Interval { period_ms: 1_000 },
            channel_capacity: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_serde_shape() {
        let json = serde_json::to_string(&TrackingTrigger::Movement {
            poll_ms: 500,
            min_distance_m: 25.0,
        })
        .unwrap();
        assert_eq!(json, r#"{"trigger":"movement","poll_ms":500,"min_distance_m":25.0}"#);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        assert_eq!(
            TrackingTrigger::Interval { period_ms: 0 }.period(),
            Duration::from_millis(1)
        );
        assert_eq!(SamplingConfig::for_testing().ceiling_ms(), 150);
    }
}
