//! Reindex settings, the `[reindex]` config table.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::RetryPolicy;

/// Reindex runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Records fetched per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retry policy for failing batches
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Batches one slice may run before the job pauses (0 = unlimited)
    #[serde(default = "default_max_batches_per_slice")]
    pub max_batches_per_slice: u32,

    /// Wall time one slice may run before the job pauses, in milliseconds
    /// (0 = unlimited)
    #[serde(default = "default_time_slice_ms")]
    pub time_slice_ms: u64,

    /// Directory for file-backed job state; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

fn default_batch_size() -> usize {
    100
}

fn default_max_batches_per_slice() -> u32 {
    50
}

fn default_time_slice_ms() -> u64 {
    60_000
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            retry: RetryPolicy::default(),
            max_batches_per_slice: default_max_batches_per_slice(),
            time_slice_ms: default_time_slice_ms(),
            state_dir: None,
        }
    }
}

impl ReindexConfig {
    /// Slice time budget, `None` when unlimited.
    pub fn time_slice(&self) -> Option<Duration> {
        (self.time_slice_ms > 0).then(|| Duration::from_millis(self.time_slice_ms))
    }

    /// Slice batch budget, `None` when unlimited.
    pub fn batch_budget(&self) -> Option<u32> {
        (self.max_batches_per_slice > 0).then_some(self.max_batches_per_slice)
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets both slice budgets (0 = unlimited).
    pub fn with_slice(mut self, max_batches: u32, time_slice_ms: u64) -> Self {
        self.max_batches_per_slice = max_batches;
        self.time_slice_ms = time_slice_ms;
        self
    }
}
