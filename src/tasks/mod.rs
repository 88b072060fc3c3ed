//! Background Tasks Module
//!
//! Contains background tasks that run alongside a pool.
//!
//! # Tasks
//! - Expiration Sweeper: Removes expired items at a fixed interval

mod sweeper;

pub use sweeper::Sweeper;
