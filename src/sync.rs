use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use std::sync::Arc;

use log::trace;
use parking_lot::RwLock;
use serde::de::DeserializeSeed;

mod reentry;

use reentry::ReentryGuard;

use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::hash::DefaultHashBuilder;
use crate::map::{de, OrderedMap};
use crate::sort;

/// A shared strict-weak-order "less than" predicate over keys.
pub type Comparator<K> = Arc<dyn Fn(&K, &K) -> bool + Send + Sync>;

/// Insertion-ordered hash map that can be shared between threads.
///
/// Every operation takes `&self`. Reads ([`get`](Self::get), [`has`](Self::has),
/// [`len`](Self::len), [`pairs`](Self::pairs), [`keys`](Self::keys), [`values`](Self::values))
/// share a read lock; mutations ([`set`](Self::set), [`upsert`](Self::upsert),
/// [`delete`](Self::delete), [`clear`](Self::clear), [`insert_before`](Self::insert_before),
/// [`insert_after`](Self::insert_after)) take the write lock.
///
/// Snapshots (`pairs`, `keys`, `values`, `sorted_pairs`) are copies: neither side sees later
/// changes to the other.
///
/// ```
/// use orderedmap::OrderedContainer;
///
/// let stages = OrderedContainer::new();
/// stages.set("parse", 1);
/// stages.set("emit", 3);
/// stages.insert_before(&"emit", "check", 2).unwrap();
/// stages.set("parse", 10);
///
/// assert_eq!(stages.keys(), ["parse", "check", "emit"]);
/// assert_eq!(stages.get(&"parse"), Some(10));
/// ```
pub struct OrderedContainer<K, V, S = DefaultHashBuilder> {
    map: RwLock<OrderedMap<K, V, S>>,
    less: Option<Comparator<K>>,
    reentry: ReentryGuard,
}

impl<K, V> OrderedContainer<K, V> {
    pub fn new() -> Self {
        Self::from(OrderedMap::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self::from(OrderedMap::with_capacity(cap))
    }

    pub fn builder() -> Builder<K, V> {
        Builder::new()
    }
}

impl<K, V, S> OrderedContainer<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from(OrderedMap::with_hasher(hasher))
    }

    pub(crate) fn from_parts(map: OrderedMap<K, V, S>, less: Option<Comparator<K>>) -> Self {
        Self {
            map: RwLock::new(map),
            less,
            reentry: ReentryGuard::new(),
        }
    }

    /// The comparator `sorted_pairs` falls back to, if one was registered.
    pub fn default_comparator(&self) -> Option<&Comparator<K>> {
        self.less.as_ref()
    }

    pub fn len(&self) -> usize {
        self.reentry.check();
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.reentry.check();
        self.map.read().capacity()
    }

    /// Removes every entry. Allocated capacity is kept, so refilling does not reallocate.
    pub fn clear(&self) {
        self.reentry.check();
        let mut map = self.map.write();
        trace!("clearing {} entries", map.len());
        map.clear();
    }

    /// Unwraps the container into its unsynchronized map.
    pub fn into_inner(self) -> OrderedMap<K, V, S> {
        self.map.into_inner()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> OrderedContainer<K, V, S> {
    /// Inserts or updates a value.
    ///
    /// A new key goes to the end of the order. An existing key keeps its position and only
    /// its value changes.
    pub fn set(&self, key: K, value: V) {
        self.reentry.check();
        self.map.write().insert(key, value);
    }

    /// Atomic insert-or-update.
    ///
    /// If `key` is absent, stores `new_value` at the end of the order and returns it with
    /// `true`; `update` is not called and may be `None`.
    ///
    /// If `key` is present, `update` is required: it is called exactly once with the current
    /// value while the write lock is held, and its result replaces the value and is returned
    /// with `false`. Without it the call fails with [`Error::MissingUpdateFunction`] and nothing
    /// changes.
    ///
    /// `update` must be quick and must not touch this container: the lock is not reentrant, so
    /// calling back in deadlocks (debug builds panic instead).
    pub fn upsert(&self, key: K, new_value: V, update: Option<&dyn Fn(&V) -> V>) -> Result<(V, bool)>
    where
        V: Clone,
    {
        self.reentry.check();
        let mut map = self.map.write();

        if let Some(current) = map.get_mut(&key) {
            let update = update.ok_or(Error::MissingUpdateFunction)?;
            let updated = {
                let _scope = self.reentry.enter();
                update(&*current)
            };
            *current = updated.clone();
            return Ok((updated, false));
        }

        map.insert(key, new_value.clone());
        Ok((new_value, true))
    }

    /// Like [`upsert`](Self::upsert) with an update function that is always supplied.
    pub fn upsert_with<F>(&self, key: K, new_value: V, update: F) -> (V, bool)
    where
        V: Clone,
        F: FnOnce(&V) -> V,
    {
        self.reentry.check();
        let mut map = self.map.write();

        if let Some(current) = map.get_mut(&key) {
            let updated = {
                let _scope = self.reentry.enter();
                update(&*current)
            };
            *current = updated.clone();
            return (updated, false);
        }

        map.insert(key, new_value.clone());
        (new_value, true)
    }

    /// Returns a copy of the value stored for `key`.
    pub fn get<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        V: Clone,
    {
        self.reentry.check();
        self.map.read().get(key).cloned()
    }

    /// Runs `f` on the value stored for `key` under the read lock.
    ///
    /// For values that are expensive or impossible to clone. `f` has the same restrictions as
    /// the `upsert` callback.
    pub fn get_with<Q: Hash + Eq + ?Sized, R, F: FnOnce(&V) -> R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
    {
        self.reentry.check();
        let map = self.map.read();
        let value = map.get(key)?;
        let _scope = self.reentry.enter();

        Some(f(value))
    }

    pub fn has<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.reentry.check();
        self.map.read().contains_key(key)
    }

    /// Removes `key` and returns its value. Later entries move up one position.
    pub fn delete<Q: Hash + Eq + ?Sized>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
    {
        self.reentry.check();
        self.map.write().shift_remove(key)
    }

    /// Inserts `key` immediately before `target`.
    ///
    /// Fails with [`Error::DuplicateKey`] if `key` is already present, or
    /// [`Error::TargetNotFound`] if `target` is not. A failed call changes nothing.
    pub fn insert_before<Q: Hash + Eq + ?Sized>(&self, target: &Q, key: K, value: V) -> Result<()>
    where
        K: Borrow<Q>,
    {
        self.reentry.check();
        let index = self.map.write().insert_before(target, key, value)?;
        trace!("inserted entry at position {}", index);
        Ok(())
    }

    /// Inserts `key` immediately after `target`. Fails like [`insert_before`](Self::insert_before).
    pub fn insert_after<Q: Hash + Eq + ?Sized>(&self, target: &Q, key: K, value: V) -> Result<()>
    where
        K: Borrow<Q>,
    {
        self.reentry.check();
        let index = self.map.write().insert_after(target, key, value)?;
        trace!("inserted entry at position {}", index);
        Ok(())
    }
}

impl<K: Clone, V: Clone, S> OrderedContainer<K, V, S> {
    /// Copies out every `(key, value)` pair in order.
    pub fn pairs(&self) -> Vec<(K, V)> {
        self.reentry.check();
        self.map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns a copy of the pairs sorted by key, leaving the stored order untouched.
    ///
    /// `less` overrides the default comparator given at construction; with neither the call
    /// fails with [`Error::MissingComparator`]. The sort is stable, so keys the comparator
    /// considers equivalent keep their current relative order.
    ///
    /// Only the copy is made under the read lock. Sorting happens after the lock is released,
    /// so a slow comparator never holds up writers, and it may freely use this container.
    pub fn sorted_pairs(&self, less: Option<&dyn Fn(&K, &K) -> bool>) -> Result<Vec<(K, V)>> {
        let less: &dyn Fn(&K, &K) -> bool = match (less, &self.less) {
            (Some(less), _) => less,
            (None, Some(default)) => &**default,
            (None, None) => return Err(Error::MissingComparator),
        };

        let pairs = self.pairs();
        trace!("sorting snapshot of {} entries", pairs.len());

        Ok(sort::stable_sort_by(pairs, |a, b| less(&a.0, &b.0)))
    }
}

impl<K: Clone, V, S> OrderedContainer<K, V, S> {
    pub fn keys(&self) -> Vec<K> {
        self.reentry.check();
        self.map.read().keys().cloned().collect()
    }
}

impl<K, V: Clone, S> OrderedContainer<K, V, S> {
    pub fn values(&self) -> Vec<V> {
        self.reentry.check();
        self.map.read().values().cloned().collect()
    }
}

impl<K, V, S: Default> Default for OrderedContainer<K, V, S> {
    fn default() -> Self {
        Self::from(OrderedMap::default())
    }
}

impl<K, V, S> From<OrderedMap<K, V, S>> for OrderedContainer<K, V, S> {
    fn from(map: OrderedMap<K, V, S>) -> Self {
        Self::from_parts(map, None)
    }
}

impl<K: Hash + Eq, V, S: Default + BuildHasher> FromIterator<(K, V)> for OrderedContainer<K, V, S> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from(OrderedMap::from_iter(iter))
    }
}

impl<K: core::fmt::Debug, V: core::fmt::Debug, S> core::fmt::Debug for OrderedContainer<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.map.read().iter()).finish()
    }
}

impl<K: serde::ser::Serialize, V: serde::ser::Serialize, S> serde::ser::Serialize
    for OrderedContainer<K, V, S>
{
    fn serialize<__S>(&self, serializer: __S) -> core::result::Result<__S::Ok, __S::Error>
    where
        __S: serde::Serializer,
    {
        self.reentry.check();
        serde::ser::Serialize::serialize(&*self.map.read(), serializer)
    }
}

impl<
        'de,
        K: serde::de::Deserialize<'de> + Hash + Eq,
        V: serde::de::Deserialize<'de>,
        S: BuildHasher + Default,
    > serde::de::Deserialize<'de> for OrderedContainer<K, V, S>
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de::WithHasher::new(S::default())
            .deserialize(deserializer)
            .map(Self::from)
    }
}
