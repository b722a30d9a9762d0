//! Polling wait for a lagging read path to reflect a write.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::config::SyncConfig;

/// Waits for a freshness signal to change.
///
/// A changed signal only shows that *some* write landed downstream, not that
/// a specific one did.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl ConsistencyWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.wait_timeout(), config.poll_interval())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Blocks until `read_signal` returns a value different from its first
    /// reading, or the timeout elapses.
    ///
    /// # Returns
    /// `Ok(true)` on change, `Ok(false)` on timeout. Errors from
    /// `read_signal` are returned as-is and not retried.
    pub fn wait<F, T, E>(&self, read_signal: F) -> Result<bool, E>
    where
        F: FnMut() -> Result<T, E>,
        T: PartialEq + Debug,
    {
        wait(read_signal, self.timeout, self.poll_interval)
    }
}

impl Default for ConsistencyWaiter {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Polls `read_signal` every `poll_interval` until its value differs from
/// the initial reading (`Ok(true)`) or `timeout` elapses (`Ok(false)`).
pub fn wait<F, T, E>(
    mut read_signal: F,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool, E>
where
    F: FnMut() -> Result<T, E>,
    T: PartialEq + Debug,
{
    let initial = read_signal()?;
    let start = Instant::now();
    let mut polls = 0u32;

    while start.elapsed() < timeout {
        std::thread::sleep(poll_interval);
        polls += 1;

        let current = read_signal()?;
        tracing::debug!(polls, ?initial, ?current, "Polled freshness signal");
        if current != initial {
            tracing::info!(
                polls,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Freshness signal changed"
            );
            return Ok(true);
        }
    }

    tracing::warn!(
        polls,
        timeout_ms = timeout.as_millis() as u64,
        "Timeout reached, freshness signal unchanged"
    );
    Ok(false)
}
