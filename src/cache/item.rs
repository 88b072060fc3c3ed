//! Cache Item Module
//!
//! Defines the value container stored in the pool and returned by lookups.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{CacheError, Result};

/// Opaque payload held by an item.
pub type Payload = Arc<dyn Any + Send + Sync>;

// == Item ==
/// A keyed value with an absolute expiration instant.
///
/// The hit flag describes the lookup that produced this item. Items inserted
/// with [`Store::put`](crate::cache::Store::put) are stored with the flag
/// cleared, and only items returned by a successful lookup report a hit.
#[derive(Clone)]
pub struct Item {
    key: String,
    data: Option<Payload>,
    expires_at: DateTime<Utc>,
    hit: bool,
}

impl Item {
    // == Constructors ==
    /// Creates an empty item for `key`.
    ///
    /// The expiration defaults to the Unix epoch, so an item stored without
    /// an explicit expiration is evicted by the next sweep.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: None,
            expires_at: DateTime::<Utc>::UNIX_EPOCH,
            hit: false,
        }
    }

    /// Creates an item for `key` holding `value`.
    pub fn with_value<T>(key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut item = Self::new(key);
        item.set_value(value);
        item
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // == Payload ==
    /// Replaces the payload. The caller is responsible for type consistency.
    pub fn set_value<T>(&mut self, value: T)
    where
        T: Any + Send + Sync,
    {
        self.data = Some(Arc::new(value));
    }

    /// Returns the payload, or `None` if it was never set.
    pub fn value(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.data.as_deref()
    }

    /// Returns the payload downcast to `T`.
    ///
    /// # Errors
    /// - `MissingValue` if no payload was ever set (including every miss)
    /// - `TypeMismatch` if the payload is not a `T`
    pub fn value_as<T: Any>(&self) -> Result<&T> {
        let data = self.value().ok_or_else(|| CacheError::MissingValue {
            key: self.key.clone(),
        })?;
        data.downcast_ref::<T>()
            .ok_or_else(|| CacheError::TypeMismatch {
                key: self.key.clone(),
                expected: type_name::<T>(),
            })
    }

    /// Returns true if this item came from a lookup that found its key.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub(crate) fn set_hit(&mut self, hit: bool) {
        self.hit = hit;
    }

    // == Expiration ==
    pub fn set_expiration_at(&mut self, instant: DateTime<Utc>) {
        self.expires_at = instant;
    }

    /// Sets the expiration to now plus `ttl`, saturating at the latest
    /// representable instant.
    pub fn set_expiration_after(&mut self, ttl: Duration) {
        let now = Utc::now();
        self.expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Boundary condition: an item expiring exactly at `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("key", &self.key)
            .field("has_value", &self.data.is_some())
            .field("expires_at", &self.expires_at)
            .field("hit", &self.hit)
            .finish()
    }
}
