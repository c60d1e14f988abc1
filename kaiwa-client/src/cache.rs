use std::{hash::Hash, num::NonZeroUsize};

use lru::LruCache;

/// Bounded map that evicts its oldest insertion once full.
///
/// Lookups never refresh an entry's age, and neither does overwriting an
/// existing key. A capacity of 0 disables caching altogether.
pub struct FifoCache<K: Hash + Eq, V> {
    entries: Option<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V> FifoCache<K, V> {
    pub fn new(capacity: usize) -> FifoCache<K, V> {
        FifoCache {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.cap().get())
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.entries.as_ref()?.peek(k)
    }

    /// Returns the entry evicted to make room, if any
    pub fn insert(&mut self, k: K, v: V) -> Option<(K, V)> {
        let entries = self.entries.as_mut()?;
        if let Some(slot) = entries.peek_mut(&k) {
            *slot = v;
            return None;
        }
        entries.push(k, v)
    }

    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.entries.as_mut()?.pop(k)
    }

    /// Drops every entry whose key does not satisfy `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        let dropped = entries
            .iter()
            .filter_map(|(k, _)| (!keep(k)).then(|| k.clone()))
            .collect::<Vec<_>>();
        for k in dropped {
            entries.pop(&k);
        }
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }
}
