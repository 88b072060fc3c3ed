//! Cache Module
//!
//! Provides the item model and the expiring pool that owns it.

mod item;
pub(crate) mod store;


// Re-export public types
pub use item::{Item, Payload};
pub use store::Store;
