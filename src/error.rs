//! Error types for the cache pool
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache pool.
///
/// Absent keys are never errors; lookups report them through the hit flag.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Sweep interval must be strictly positive
    #[error("Invalid cleanup interval: {0:?}")]
    InvalidInterval(Duration),

    /// The background sweeper could not be started
    #[error("Failed to start sweeper: {0}")]
    SweeperStart(#[from] io::Error),

    /// Item carries no payload
    #[error("Item has no value: {key}")]
    MissingValue { key: String },

    /// Payload is not of the requested type
    #[error("Item {key} does not hold a value of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

// == Result Type Alias ==
/// Convenience Result type for the cache pool.
pub type Result<T> = std::result::Result<T, CacheError>;
