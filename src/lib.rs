//! TTL Pool - An in-process expiring key/value cache
//!
//! Values of any type are stored under string keys with an absolute
//! expiration instant. A background sweeper evicts expired items on a fixed
//! interval until the pool is stopped.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Item, Store};
pub use config::StoreConfig;
pub use error::{CacheError, Result};
