//! Process-wide concurrent caches with set-if-absent ("first writer wins")
//! semantics, built directly on `std::sync::RwLock`. The pack's only
//! concurrent-map precedent anywhere near this domain is `rayon`'s own
//! work-stealing queues, not a concurrent hash map crate, so this stays on
//! `std::sync` rather than pulling in one just for this.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// A concurrent `HashMap` where concurrent inserts for the same key agree
/// on the first value written; later writers observe (and get back) that
/// winning value instead of overwriting it.
pub struct SharedCache<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for SharedCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

/// Outcome of a set-if-absent insert: whether this call's value is the one
/// that ended up stored, and the stored value either way.
pub struct InsertOutcome<V> {
    pub won: bool,
    pub value: V,
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().expect("cache lock poisoned").get(key).cloned()
    }

    /// Inserts `value` for `key` if absent. If another value is already
    /// present, that value wins and is returned with `won: false`; the
    /// caller is expected to log the conflict (it never produces an
    /// `Err`, matching the "logged, not fatal" cache-collision policy).
    pub fn set_if_absent(&self, key: K, value: V) -> InsertOutcome<V> {
        let mut guard = self.inner.write().expect("cache lock poisoned");
        match guard.get(&key) {
            Some(existing) => InsertOutcome {
                won: *existing == value,
                value: existing.clone(),
            },
            None => {
                guard.insert(key, value.clone());
                InsertOutcome { won: true, value }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
