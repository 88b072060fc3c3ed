//! Configuration Module
//!
//! Construction parameters for a cache pool.

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default interval between background sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Pool configuration parameters.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Interval between background sweeps, must be non-zero
    pub cleanup_interval: Duration,
}

impl StoreConfig {
    /// Creates a new StoreConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    // == Validate ==
    /// Rejects a zero sweep interval.
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidInterval(self.cleanup_interval));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
