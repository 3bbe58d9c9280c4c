//! Retry policy for failed reindex batches.

use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder};
use serde::{Deserialize, Serialize};

/// Delay between attempts of a failing batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    None,

    /// Same delay before every retry.
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },

    /// Delay multiplied by `factor` after every failure, capped at `max_ms`.
    Exponential {
        /// First delay in milliseconds
        initial_ms: u64,
        /// Growth factor
        #[serde(default = "default_factor")]
        factor: f32,
        /// Upper bound in milliseconds
        max_ms: u64,
    },
}

fn default_factor() -> f32 {
    2.0
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            initial_ms: 500,
            factor: default_factor(),
            max_ms: 30_000,
        }
    }
}

/// How often a batch may fail before its job fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Consecutive failures of one batch that fail the job (at least 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts
    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy retrying immediately.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
        }
    }

    /// A policy with a fixed delay.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed {
                delay_ms: delay.as_millis() as u64,
            },
        }
    }

    /// Whether `failures` consecutive failures exhaust the policy.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts.max(1)
    }

    /// Delay to wait after the `failures`-th consecutive failure.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let step = failures.saturating_sub(1) as usize;
        match &self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => {
                let delay = Duration::from_millis(*delay_ms);
                ConstantBuilder::default()
                    .with_delay(delay)
                    .with_max_times(step + 1)
                    .build()
                    .nth(step)
                    .unwrap_or(delay)
            }
            Backoff::Exponential {
                initial_ms,
                factor,
                max_ms,
            } => {
                let max = Duration::from_millis(*max_ms);
                let delay = ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(*initial_ms))
                    .with_max_delay(max)
                    .with_factor(factor.max(1.0))
                    .with_max_times(step + 1)
                    .build()
                    .nth(step)
                    .unwrap_or(max);
                whole_millis(delay).min(max)
            }
        }
    }
}

/// Rounds away the float noise the exponential builder multiplies in.
fn whole_millis(delay: Duration) -> Duration {
    Duration::from_millis((delay.as_secs_f64() * 1_000.0).round() as u64)
}
