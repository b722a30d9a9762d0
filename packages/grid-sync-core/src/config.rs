//! Sync configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name of the identifier column
    pub id_column: String,
    /// Maximum time to wait for a freshness signal change, in milliseconds
    pub wait_timeout_ms: u64,
    /// Interval between freshness polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum retry attempts for failed snapshot reads
    pub read_max_retries: u32,
    /// Delay between snapshot read retries, in milliseconds
    pub read_retry_delay_ms: u64,
    /// Lower bound (inclusive) for random client-side identifiers
    pub random_id_low: i64,
    /// Upper bound (exclusive) for random client-side identifiers
    pub random_id_high: i64,
}

impl SyncConfig {
    /// Returns the freshness wait timeout.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Returns the freshness poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            wait_timeout_ms: 60_000,
            poll_interval_ms: 1000,
            read_max_retries: 3,
            read_retry_delay_ms: 100,
            random_id_low: 1,
            random_id_high: i32::MAX as i64,
        }
    }
}
