//! Cache Store Module
//!
//! The pool that owns the key to item mapping and its background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::Item;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::tasks::Sweeper;

pub(crate) type ItemMap = HashMap<String, Item>;
pub(crate) type SharedItems = Arc<RwLock<ItemMap>>;

// == Lock Helpers ==
// A panic while a guard is held poisons the lock. The map is never left
// half-updated by any operation here, so the poison is discarded.
pub(crate) fn read_items(items: &RwLock<ItemMap>) -> RwLockReadGuard<'_, ItemMap> {
    items.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_items(items: &RwLock<ItemMap>) -> RwLockWriteGuard<'_, ItemMap> {
    items.write().unwrap_or_else(PoisonError::into_inner)
}

/// Removes every item expiring at or before `now`.
///
/// Returns the number of items removed.
pub(crate) fn purge_expired(items: &RwLock<ItemMap>, now: DateTime<Utc>) -> usize {
    let mut guard = write_items(items);
    let before = guard.len();
    guard.retain(|_, item| !item.is_expired_at(now));
    before - guard.len()
}

fn lookup(items: &ItemMap, key: &str) -> Item {
    match items.get(key) {
        Some(stored) => {
            let mut item = stored.clone();
            item.set_hit(true);
            item
        }
        None => Item::new(key),
    }
}

// == Store ==
/// Thread-safe pool of expiring items.
///
/// Reads (`get`, `get_many`, `has`) share a reader lock; every mutation takes
/// the writer lock. Expired items are removed only by the background sweep,
/// so a lookup between expiration and the next sweep still reports a hit
/// with the stale value.
///
/// The sweeper runs until [`Store::stop`] is called or the store is dropped.
/// Share a store between threads with `Arc<Store>`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_pool::{Item, Store};
///
/// let store = Store::new(Duration::from_secs(1)).unwrap();
///
/// let mut item = Item::with_value("answer", 42u32);
/// item.set_expiration_after(Duration::from_secs(60));
/// store.put(item);
///
/// let found = store.get("answer");
/// assert!(found.is_hit());
/// assert_eq!(*found.value_as::<u32>().unwrap(), 42);
///
/// store.stop();
/// ```
#[derive(Debug)]
pub struct Store {
    /// Key to item mapping, shared with the sweeper
    items: SharedItems,
    /// Background sweep handle
    sweeper: Mutex<Sweeper>,
}

impl Store {
    // == Constructors ==
    /// Creates a store sweeping expired items every `cleanup_interval`.
    ///
    /// # Errors
    /// - `InvalidInterval` if `cleanup_interval` is zero
    /// - `SweeperStart` if the sweeper thread could not be started
    pub fn new(cleanup_interval: Duration) -> Result<Self> {
        Self::with_config(StoreConfig::new().with_cleanup_interval(cleanup_interval))
    }

    /// Creates a store from a configuration. The sweeper is running when
    /// this returns.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let items: SharedItems = Arc::new(RwLock::new(HashMap::new()));
        let sweeper = Sweeper::spawn(Arc::clone(&items), config.cleanup_interval)?;

        Ok(Self {
            items,
            sweeper: Mutex::new(sweeper),
        })
    }

    // == Get ==
    /// Looks up `key`.
    ///
    /// On a miss the returned item carries only the key, no value, and a
    /// cleared hit flag.
    pub fn get(&self, key: &str) -> Item {
        lookup(&read_items(&self.items), key)
    }

    // == Get Many ==
    /// Looks up every key under a single reader lock, preserving order.
    pub fn get_many<I>(&self, keys: I) -> Vec<Item>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let guard = read_items(&self.items);
        keys.into_iter()
            .map(|key| lookup(&guard, key.as_ref()))
            .collect()
    }

    // == Has ==
    pub fn has(&self, key: &str) -> bool {
        read_items(&self.items).contains_key(key)
    }

    // == Put ==
    /// Inserts `item`, replacing any item stored under the same key.
    pub fn put(&self, mut item: Item) {
        item.set_hit(false);
        let key = item.key().to_string();
        write_items(&self.items).insert(key, item);
    }

    // == Delete ==
    /// Removes `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        write_items(&self.items).remove(key);
    }

    // == Delete Many ==
    pub fn delete_many<I>(&self, keys: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut guard = write_items(&self.items);
        for key in keys {
            guard.remove(key.as_ref());
        }
    }

    // == Clear ==
    pub fn clear(&self) {
        *write_items(&self.items) = HashMap::new();
    }

    // == Cleanup Expired ==
    /// Runs one sweep immediately against the current time.
    ///
    /// Returns the number of items removed. The background sweeper does
    /// the same on every tick.
    pub fn cleanup_expired(&self) -> usize {
        purge_expired(&self.items, Utc::now())
    }

    // == Stop ==
    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Once this returns the sweeper no longer touches the map. Calling it
    /// again is a no-op. The store itself stays usable.
    pub fn stop(&self) {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }

    /// Returns true until the sweeper has been stopped.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_running()
    }

    // == Length ==
    /// Returns the number of stored items, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        read_items(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        read_items(&self.items).is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::thread::sleep;

    fn test_store() -> Store {
        // Long interval keeps the sweeper out of the way
        Store::new(Duration::from_secs(3600)).unwrap()
    }

    fn live_item<T: std::any::Any + Send + Sync>(key: &str, value: T) -> Item {
        let mut item = Item::with_value(key, value);
        item.set_expiration_after(Duration::from_secs(3600));
        item
    }

    #[test]
    fn test_store_new() {
        let store = test_store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(store.is_sweeping());
    }

    #[test]
    fn test_store_rejects_zero_interval() {
        let result = Store::new(Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidInterval(_))));
    }

    #[test]
    fn test_store_put_and_get() {
        let store = test_store();

        store.put(live_item("key1", "value1".to_string()));
        let item = store.get("key1");

        assert!(item.is_hit());
        assert_eq!(item.key(), "key1");
        assert_eq!(item.value_as::<String>().unwrap(), "value1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_miss() {
        let store = test_store();

        let item = store.get("nonexistent");
        assert!(!item.is_hit());
        assert_eq!(item.key(), "nonexistent");
        assert!(item.value().is_none());
    }

    #[test]
    fn test_store_put_clears_hit_flag() {
        let store = test_store();
        store.put(live_item("key1", 1u8));

        // Re-inserting a looked-up item must not persist its hit flag
        let found = store.get("key1");
        store.delete("key1");
        store.put(found);

        let guard = read_items(&store.items);
        assert!(!guard["key1"].is_hit());
    }

    #[test]
    fn test_store_overwrite() {
        let store = test_store();

        store.put(live_item("key1", 1u32));
        store.put(live_item("key1", 2u32));

        assert_eq!(*store.get("key1").value_as::<u32>().unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_many_preserves_order() {
        let store = test_store();
        store.put(live_item("a", 1u32));
        store.put(live_item("c", 3u32));

        let items = store.get_many(["a", "b", "c"]);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].key(), "a");
        assert!(items[0].is_hit());
        assert_eq!(items[1].key(), "b");
        assert!(!items[1].is_hit());
        assert_eq!(items[2].key(), "c");
        assert_eq!(*items[2].value_as::<u32>().unwrap(), 3);
    }

    #[test]
    fn test_store_has() {
        let store = test_store();
        store.put(live_item("key1", ()));

        assert!(store.has("key1"));
        assert!(!store.has("key2"));
    }

    #[test]
    fn test_store_delete() {
        let store = test_store();
        store.put(live_item("key1", ()));

        store.delete("key1");
        assert!(!store.has("key1"));

        // Absent key is a no-op
        store.delete("key1");
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_delete_many() {
        let store = test_store();
        for key in ["a", "b", "c"] {
            store.put(live_item(key, ()));
        }

        store.delete_many(vec!["a".to_string(), "c".to_string(), "missing".to_string()]);

        assert!(!store.has("a"));
        assert!(store.has("b"));
        assert!(!store.has("c"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_clear() {
        let store = test_store();
        store.put(live_item("a", ()));
        store.put(live_item("b", ()));

        store.clear();

        assert!(store.is_empty());
        assert!(!store.has("a"));
        assert!(!store.has("b"));
    }

    #[test]
    fn test_store_get_does_not_expire_lazily() {
        let store = test_store();
        let mut item = Item::with_value("stale", 7u32);
        item.set_expiration_at(Utc::now());
        store.put(item);

        sleep(Duration::from_millis(5));

        let found = store.get("stale");
        assert!(found.is_hit());
        assert_eq!(*found.value_as::<u32>().unwrap(), 7);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let store = test_store();
        let mut expired = Item::with_value("expired", ());
        expired.set_expiration_at(Utc::now());
        store.put(expired);
        store.put(live_item("live", ()));

        let removed = store.cleanup_expired();

        assert_eq!(removed, 1);
        assert!(!store.has("expired"));
        assert!(store.has("live"));
    }

    #[test]
    fn test_store_item_without_expiration_is_swept() {
        let store = test_store();
        store.put(Item::with_value("no_ttl", ()));

        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_stop_is_idempotent() {
        let store = test_store();

        store.stop();
        assert!(!store.is_sweeping());
        store.stop();
        assert!(!store.is_sweeping());

        // Operations keep working after stop
        store.put(live_item("key1", ()));
        assert!(store.has("key1"));
    }

    #[test]
    fn test_store_recovers_from_poisoned_lock() {
        let store = Arc::new(test_store());
        store.put(live_item("key1", 1u32));

        let poisoner = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            let _guard = write_items(&poisoner.items);
            panic!("panic while holding the writer lock");
        })
        .join();
        assert!(result.is_err());

        assert!(store.has("key1"));
        store.put(live_item("key2", 2u32));
        assert_eq!(store.len(), 2);
    }
}
