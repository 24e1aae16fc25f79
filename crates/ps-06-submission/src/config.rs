//! # Submission Configuration
//!
//! Backoff follows the usual exponential-with-jitter shape:
//! `delay = min(initial * multiplier^attempt, max_delay)`, then jittered.

use std::time::Duration;

use ps_01_canonical_encoding::CanonicalFormat;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry behaviour for transport calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0); 0.0 disables jitter.
    pub jitter: f64,
    /// Draw from `[initial, 3 * delay]` instead of `delay ± jitter`.
    pub decorrelated_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.5,
            decorrelated_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short, jitter-free delays.
    pub fn for_testing() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: 0.0,
            decorrelated_jitter: false,
        }
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter factor
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt + 1` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let capped = (self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32)).min(max);

        let delay = if self.jitter <= 0.0 {
            capped
        } else if self.decorrelated_jitter {
            let low = self.initial_delay.as_secs_f64().min(max);
            let high = (capped * 3.0).min(max).max(low);
            rand::thread_rng().gen_range(low..=high)
        } else {
            let spread = capped * self.jitter;
            (capped + rand::thread_rng().gen_range(-spread..=spread)).max(0.0)
        };

        Duration::from_secs_f64(delay)
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionConfig {
    /// Backoff for transport calls.
    pub retry: RetryConfig,
    /// Records taken per `drain_pending` call when the caller has no preference.
    pub default_batch_size: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            default_batch_size: 32,
        }
    }
}

impl SubmissionConfig {
    /// Short delays for tests.
    pub fn for_testing() -> Self {
        Self {
            retry: RetryConfig::for_testing(),
            default_batch_size: 8,
        }
    }
}

/// In-memory ledger behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Message form single proofs are verified against.
    pub format: CanonicalFormat,
    /// Confirm submissions immediately instead of leaving them `Pending`
    /// until `finalize_pending`.
    pub auto_confirm: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            format: CanonicalFormat::default(),
            auto_confirm: false,
        }
    }
}

impl LedgerConfig {
    /// Ledger that leaves submissions `Pending` until finalized.
    pub fn for_testing() -> Self {
        Self::default()
    }
}
