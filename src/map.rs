use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::{Extend, FromIterator, FusedIterator};
use std::ops::Index;

mod raw;

use raw::RawOrderedMap;

use serde::de::DeserializeSeed;

use crate::error::{Error, Result};
use crate::hash::DefaultHashBuilder;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Placement {
    Before,
    After,
}

/// A Hash table based collection that iterates in insertion order
///
/// Updating the value of an existing key leaves it where it is. Entries only move when
/// something is inserted in front of them with [`insert_before`](Self::insert_before) or
/// [`insert_after`](Self::insert_after), or when an earlier entry is removed.
///
/// This type does no locking of its own; [`OrderedContainer`](crate::OrderedContainer)
/// wraps it for shared use across threads.
#[derive(Clone)]
pub struct OrderedMap<K, V, S = DefaultHashBuilder> {
    inner: RawOrderedMap<K, V>,
    hasher: S,
}

impl<K: core::fmt::Debug, V: core::fmt::Debug, S> core::fmt::Debug for OrderedMap<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self).finish()
    }
}

impl<K, V, S: Default> Default for OrderedMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RawOrderedMap::new(),
            hasher: DefaultHashBuilder::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: RawOrderedMap::with_capacity(cap),
            hasher: DefaultHashBuilder::new(),
        }
    }
}

impl<K, V, S> OrderedMap<K, V, S> {
    pub const fn with_hasher(hasher: S) -> Self {
        Self {
            inner: RawOrderedMap::new(),
            hasher,
        }
    }

    pub fn with_capacity_and_hasher(cap: usize, hasher: S) -> Self {
        Self {
            inner: RawOrderedMap::with_capacity(cap),
            hasher,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Allocated capacity is kept for reuse.
    pub fn clear(&mut self) {
        self.inner.clear()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> OrderedMap<K, V, S> {
    fn hash_key<Q: Hash + ?Sized>(hasher: &S, key: &Q) -> u64 {
        let mut hasher = hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn key_eq<Q: Hash + Eq + ?Sized>(key: &Q) -> impl FnMut(&K) -> bool + '_
    where
        K: Borrow<Q>,
    {
        move |k| <K as Borrow<Q>>::borrow(k) == key
    }

    pub fn reserve(&mut self, additional: usize) {
        self.inner.reserve(additional);
    }

    pub fn contains_key<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.get_index_of(key).is_some()
    }

    /// Returns the current position of `key` in iteration order.
    pub fn get_index_of<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, key);
        self.inner.get_index_of(hash, Self::key_eq(key))
    }

    pub fn get<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, key);
        self.inner.get(hash, Self::key_eq(key)).map(|b| &b.value)
    }

    pub fn get_key_value<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, key);

        self.inner
            .get(hash, Self::key_eq(key))
            .map(|b| (&b.key, &b.value))
    }

    pub fn get_mut<Q: Hash + Eq + ?Sized>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, key);
        self.inner.get_mut(hash, Self::key_eq(key)).map(|b| &mut b.value)
    }

    /// Inserts or updates a value.
    ///
    /// A new key is appended to the end of the iteration order. For an existing key only the
    /// value is replaced, the key keeps its position, and the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = Self::hash_key(&self.hasher, &key);
        self.inner.insert_full(hash, key, value, K::eq).1
    }

    /// Inserts `key` immediately before `target`, returning the position it landed at.
    ///
    /// Fails with [`Error::DuplicateKey`] if `key` is already present (checked first) or
    /// [`Error::TargetNotFound`] if `target` is absent. A failed call changes nothing.
    pub fn insert_before<Q: Hash + Eq + ?Sized>(
        &mut self,
        target: &Q,
        key: K,
        value: V,
    ) -> Result<usize>
    where
        K: Borrow<Q>,
    {
        self.insert_relative(target, key, value, Placement::Before)
    }

    /// Inserts `key` immediately after `target`, returning the position it landed at.
    ///
    /// Fails the same way as [`insert_before`](Self::insert_before).
    pub fn insert_after<Q: Hash + Eq + ?Sized>(
        &mut self,
        target: &Q,
        key: K,
        value: V,
    ) -> Result<usize>
    where
        K: Borrow<Q>,
    {
        self.insert_relative(target, key, value, Placement::After)
    }

    fn insert_relative<Q: Hash + Eq + ?Sized>(
        &mut self,
        target: &Q,
        key: K,
        value: V,
        placement: Placement,
    ) -> Result<usize>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, &key);
        if self.inner.get_index_of(hash, |k| k == &key).is_some() {
            return Err(Error::DuplicateKey);
        }

        let target_index = self.get_index_of(target).ok_or(Error::TargetNotFound)?;
        let index = match placement {
            Placement::Before => target_index,
            Placement::After => target_index + 1,
        };

        self.inner.insert_new_at(index, hash, key, value);

        Ok(index)
    }

    /// Removes `key`, shifting every later entry one position earlier.
    ///
    /// This is O(n) in the number of entries after the removed one.
    pub fn shift_remove<Q: Hash + Eq + ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
    {
        self.shift_remove_entry(key).map(|(_, val)| val)
    }

    pub fn shift_remove_entry<Q: Hash + Eq + ?Sized>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
    {
        let hash = Self::hash_key(&self.hasher, key);
        self.inner.shift_remove(hash, Self::key_eq(key))
    }
}

impl<K: Hash + Eq, Q: Hash + Eq + ?Sized, V, S: BuildHasher> Index<&Q> for OrderedMap<K, V, S>
where
    K: Borrow<Q>,
{
    type Output = V;

    #[track_caller]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no such key in table")
    }
}

impl<K, V, S> OrderedMap<K, V, S> {
    pub fn iter(&self) -> Iter<K, V> {
        Iter(self.inner.iter())
    }

    pub fn iter_mut(&mut self) -> IterMut<K, V> {
        IterMut(self.inner.iter_mut())
    }

    pub fn keys(&self) -> Keys<K, V> {
        Keys(self.inner.iter())
    }

    pub fn values(&self) -> Values<K, V> {
        Values(self.inner.iter())
    }
}

impl<K, V, S> IntoIterator for OrderedMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.inner.into_iter())
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrderedMap<K, V, S> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut OrderedMap<K, V, S> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: Hash + Eq, V, S: Default + BuildHasher> FromIterator<(K, V)> for OrderedMap<K, V, S> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::default();

        map.extend(iter);

        map
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for OrderedMap<K, V, S> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);

        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

pub struct IntoIter<K, V>(raw::IntoIter<K, V>);

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Iter<'a, K, V>(raw::Iter<'a, K, V>);

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back()
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}
impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

pub struct IterMut<'a, K, V>(raw::IterMut<'a, K, V>);

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back()
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {}
impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}

pub struct Keys<'a, K, V>(raw::Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}
impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

pub struct Values<'a, K, V>(raw::Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}
impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

impl<K: serde::ser::Serialize, V: serde::ser::Serialize, S> serde::ser::Serialize
    for OrderedMap<K, V, S>
{
    fn serialize<__S>(&self, serializer: __S) -> core::result::Result<__S::Ok, __S::Error>
    where
        __S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut ser = serializer.serialize_map(Some(self.len()))?;

        for (key, value) in self {
            ser.serialize_entry(key, value)?;
        }

        ser.end()
    }
}

impl<
        'de,
        K: serde::de::Deserialize<'de> + Hash + Eq,
        V: serde::de::Deserialize<'de>,
        S: BuildHasher + Default,
    > serde::de::Deserialize<'de> for OrderedMap<K, V, S>
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de::WithHasher::new(S::default()).deserialize(deserializer)
    }
}

pub mod de;
