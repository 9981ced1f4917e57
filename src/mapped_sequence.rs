//! Ordered, keyed containers indexable by both integer position and key.

use indexmap::IndexMap;
use std::hash::Hash;

/// An ordered sequence indexable by both integer position and a unique key.
/// Iteration always yields insertion order.
#[derive(Clone, Debug)]
pub struct MappedSequence<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: IndexMap<K, V>,
}

impl<K, V> MappedSequence<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self { inner: IndexMap::new() }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self { inner: pairs.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get_by_key(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&V> {
        self.inner.get_index(index).map(|(_, v)| v)
    }

    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.inner.get_index(index).map(|(k, _)| k)
    }

    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.inner.get_index_of(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.insert(key, value);
    }
}

impl<K, V> Default for MappedSequence<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for MappedSequence<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
