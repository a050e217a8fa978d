//! Bounded key/value cache with count and cost limits.
//!
//! Eviction is first-in first-out by insertion order. Re-inserting a key
//! moves it to the back of the queue. A limit of 0 means no limit.
//!
//! ```rust
//! use zipsync_core::cache::Cache;
//!
//! let cache: Cache<u32, &str> = Cache::new();
//! cache.set_count_limit(1);
//! cache.insert("first", 1, 0);
//! cache.insert("second", 2, 0);
//! assert_eq!(cache.value(&1), None);
//! assert_eq!(cache.value(&2), Some("second"));
//! ```

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

/// Called once per value leaving the cache
pub type EvictionCallback<V> = Arc<dyn Fn(&V) + Send + Sync>;

struct Entry<V> {
    value: V,
    cost: usize,
}

struct CacheInner<K, V> {
    map: HashMap<K, Entry<V>>,
    /// Insertion order (oldest at front)
    order: VecDeque<K>,
    total_cost: usize,
    count_limit: usize,
    total_cost_limit: usize,
}

impl<K: Eq + Hash + Clone, V> CacheInner<K, V> {
    fn take(&mut self, key: &K) -> Option<V> {
        let entry = self.map.remove(key)?;
        self.order.retain(|k| k != key);
        self.total_cost -= entry.cost;
        Some(entry.value)
    }

    fn over_limit(&self) -> bool {
        (self.count_limit > 0 && self.map.len() > self.count_limit)
            || (self.total_cost_limit > 0 && self.total_cost > self.total_cost_limit)
    }

    fn evict_to_limits(&mut self) -> Vec<V> {
        let mut evicted = Vec::new();
        while self.over_limit() {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.map.remove(&oldest) {
                self.total_cost -= entry.cost;
                evicted.push(entry.value);
            }
        }
        evicted
    }
}

/// Bounded cache shared by reference; all methods take `&self`.
pub struct Cache<K, V> {
    name: String,
    inner: RwLock<CacheInner<K, V>>,
    on_eviction: RwLock<Option<EvictionCallback<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Cache<K, V> {
    pub fn new() -> Self {
        Self::named("")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
                total_cost: 0,
                count_limit: 0,
                total_cost_limit: 0,
            }),
            on_eviction: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of entries; 0 disables the limit. Lowering it evicts
    /// immediately.
    pub fn set_count_limit(&self, limit: usize) {
        let evicted = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.count_limit = limit;
            inner.evict_to_limits()
        };
        self.notify(evicted);
    }

    /// Maximum summed cost; 0 disables the limit. Lowering it evicts
    /// immediately.
    pub fn set_total_cost_limit(&self, limit: usize) {
        let evicted = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.total_cost_limit = limit;
            inner.evict_to_limits()
        };
        self.notify(evicted);
    }

    /// Install or clear the eviction callback.
    pub fn set_on_eviction(&self, callback: Option<EvictionCallback<V>>) {
        *self
            .on_eviction
            .write()
            .unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Store `value` under `key` with the given cost, evicting the oldest
    /// entries while a limit is exceeded. A replaced value is not reported
    /// as evicted.
    pub fn insert(&self, value: V, key: K, cost: usize) {
        let evicted = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.take(&key);
            inner.map.insert(key.clone(), Entry { value, cost });
            inner.order.push_back(key);
            inner.total_cost += cost;
            inner.evict_to_limits()
        };
        self.notify(evicted);
    }

    pub fn value(&self, key: &K) -> Option<V> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.map.get(key).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.map.contains_key(key)
    }

    /// Remove one entry; the eviction callback sees the removed value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.take(key)
        };
        if let Some(value) = &removed {
            self.notify(vec![value.clone()]);
        }
        removed
    }

    /// Empty the cache, reporting every value to the eviction callback in
    /// insertion order.
    pub fn clear(&self) {
        let drained = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let order = std::mem::take(&mut inner.order);
            let mut map = std::mem::take(&mut inner.map);
            inner.total_cost = 0;
            order
                .into_iter()
                .filter_map(|key| map.remove(&key).map(|entry| entry.value))
                .collect::<Vec<V>>()
        };
        self.notify(drained);
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_cost(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total_cost
    }

    fn notify(&self, values: Vec<V>) {
        if values.is_empty() {
            return;
        }
        let callback = self
            .on_eviction
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            for value in &values {
                callback(value);
            }
        }
    }
}
