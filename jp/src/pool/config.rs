//! Pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::PoolError;

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Max concurrently running jobs
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Time between liveness checks in milliseconds
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Max accumulated runtime per job in milliseconds (absent or 0 = unbounded)
    #[serde(rename = "timeout-ms", default)]
    pub timeout_ms: Option<u64>,
}

fn default_capacity() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: None,
        }
    }
}

impl PoolConfig {
    /// Config with the given capacity and default polling, no timeout
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the per-job timeout, `None` when unbounded
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|&ms| ms > 0).map(Duration::from_millis)
    }

    /// Number of monitoring passes a never-ending job survives before it is killed
    ///
    /// Runtime advances one poll interval per pass, so this is `ceil(timeout / poll_interval)`.
    pub fn timeout_ticks(&self) -> Option<u64> {
        let timeout = self.timeout_ms.filter(|&ms| ms > 0)?;
        let poll = self.poll_interval_ms.max(1);
        Some(timeout.div_ceil(poll))
    }

    /// Reject configurations the pool cannot run with
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig("capacity must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(PoolError::InvalidConfig("poll interval must be positive".to_string()));
        }
        Ok(())
    }
}
