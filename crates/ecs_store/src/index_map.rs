//! Small associative index used for every id ↔ slot translation.
//!
//! Stable identifiers (entity ids, component ids, world ids) are mapped onto
//! volatile positions in dense arrays, and back. The live counts involved are
//! small to moderate, so the default index is a linear scan over a vector of
//! entries with tombstone-based removal.
//!
//! Callers only depend on the [`IdIndex`] contract, so the backing structure
//! can be exchanged for a sparse-array index without touching them.

/// The contract of a one-key-to-one-value index.
pub trait IdIndex<K, V> {
    /// Returns the value mapped to `key`, if any.
    fn get(&self, key: &K) -> Option<V>;

    /// Maps `key` to `value`, updating in place if `key` is already present.
    fn set(&mut self, key: K, value: V);

    /// Removes the mapping for `key`, returning the previous value.
    fn unset(&mut self, key: &K) -> Option<V>;

    /// Drops every mapping and releases the backing storage.
    fn clear(&mut self);

    /// Number of live mappings.
    fn len(&self) -> usize;

    /// Returns `true` if no key is mapped.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    tombstoned: bool,
}

/// Linear-scan index with tombstoned removal.
///
/// `set` on an absent key reuses the first tombstoned entry before appending,
/// so the entry vector never grows past the peak number of live keys.
#[derive(Debug, Clone)]
pub struct IndexMap<K, V> {
    entries: Vec<Entry<K, V>>,
    live: usize,
}

impl<K, V> IndexMap<K, V> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            live: 0,
        }
    }

    /// Create an empty index with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            live: 0,
        }
    }
}

impl<K: Copy + PartialEq, V: Copy> IndexMap<K, V> {
    /// Iterate over live `(key, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.entries
            .iter()
            .filter(|entry| !entry.tombstoned)
            .map(|entry| (entry.key, entry.value))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.tombstoned && entry.key == *key)
    }
}

impl<K, V> Default for IndexMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + PartialEq, V: Copy> IdIndex<K, V> for IndexMap<K, V> {
    fn get(&self, key: &K) -> Option<V> {
        self.position(key).map(|pos| self.entries[pos].value)
    }

    fn set(&mut self, key: K, value: V) {
        if let Some(pos) = self.position(&key) {
            self.entries[pos].value = value;
            return;
        }

        let entry = Entry {
            key,
            value,
            tombstoned: false,
        };
        match self.entries.iter().position(|entry| entry.tombstoned) {
            Some(free) => self.entries[free] = entry,
            None => self.entries.push(entry),
        }
        self.live += 1;
    }

    fn unset(&mut self, key: &K) -> Option<V> {
        let pos = self.position(key)?;
        self.entries[pos].tombstoned = true;
        self.live -= 1;
        Some(self.entries[pos].value)
    }

    fn clear(&mut self) {
        self.entries = Vec::new();
        self.live = 0;
    }

    fn len(&self) -> usize {
        self.live
    }
}
