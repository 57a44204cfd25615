use hashbrown::raw::RawTable;

use std::iter::FusedIterator;
use std::ops::Range;

#[derive(Clone, Debug)]
pub struct Bucket<K, V> {
    pub hash: u64,
    pub key: K,
    pub value: V,
}

/// Hash index over a vector of entries kept in iteration order.
///
/// `indices` holds, for every entry, its position in `entries`, stored under the entry's hash.
/// Positions are kept dense: removing or inserting in the middle renumbers every later entry.
#[derive(Clone)]
pub struct RawOrderedMap<K, V> {
    indices: RawTable<usize>,
    entries: Vec<Bucket<K, V>>,
}

impl<K, V> RawOrderedMap<K, V> {
    pub const fn new() -> Self {
        Self {
            indices: RawTable::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: RawTable::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn get_index_of<E: FnMut(&K) -> bool>(&self, hash: u64, mut eq: E) -> Option<usize> {
        let Self { indices, entries } = self;
        indices.get(hash, |&i| eq(&entries[i].key)).copied()
    }

    pub fn get<E: FnMut(&K) -> bool>(&self, hash: u64, eq: E) -> Option<&Bucket<K, V>> {
        let index = self.get_index_of(hash, eq)?;

        self.entries.get(index)
    }

    pub fn get_mut<E: FnMut(&K) -> bool>(&mut self, hash: u64, eq: E) -> Option<&mut Bucket<K, V>> {
        let index = self.get_index_of(hash, eq)?;

        self.entries.get_mut(index)
    }

    /// If `key` (according to `eq`) is not present, appends `key, value` and returns its position with `None`.
    /// Otherwise replaces the stored value in place and returns the existing position with the old value.
    ///
    /// The stored key is never replaced, and an existing entry never moves.
    pub fn insert_full<E: FnMut(&K, &K) -> bool>(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        mut eq: E,
    ) -> (usize, Option<V>) {
        let Self { indices, entries } = self;
        match indices.find_or_find_insert_slot(
            hash,
            |&i| eq(&key, &entries[i].key),
            |&i| entries[i].hash,
        ) {
            Ok(bucket) => {
                // SAFETY: `bucket` came from `indices` and the table has not been touched since
                let index = unsafe { *bucket.as_ref() };
                let old = core::mem::replace(&mut entries[index].value, value);

                (index, Some(old))
            }
            Err(slot) => {
                let index = entries.len();
                entries.push(Bucket { hash, key, value });
                // SAFETY: We just got this `slot` and we haven't mutated `indices` since getting it
                unsafe {
                    indices.insert_in_slot(hash, slot, index);
                }

                (index, None)
            }
        }
    }

    /// Inserts a key that the caller has verified is absent at `index`, shifting every entry at or
    /// after `index` one position later.
    pub fn insert_new_at(&mut self, index: usize, hash: u64, key: K, value: V) {
        debug_assert!(index <= self.entries.len());

        self.increment_indices(index..self.entries.len());
        self.entries.insert(index, Bucket { hash, key, value });

        let Self { indices, entries } = self;
        indices.insert(hash, index, |&i| entries[i].hash);
    }

    /// Removes the entry matching `eq` and closes the gap it leaves.
    pub fn shift_remove<E: FnMut(&K) -> bool>(&mut self, hash: u64, mut eq: E) -> Option<(K, V)> {
        let Self { indices, entries } = self;
        let index = indices.remove_entry(hash, |&i| eq(&entries[i].key))?;

        self.decrement_indices(index + 1..self.entries.len());
        let Bucket { key, value, .. } = self.entries.remove(index);

        Some((key, value))
    }

    // Walks backwards so that no stored position ever collides with one not yet moved.
    fn increment_indices(&mut self, range: Range<usize>) {
        let Self { indices, entries } = self;
        for i in range.rev() {
            if let Some(pos) = indices.get_mut(entries[i].hash, |&j| j == i) {
                *pos = i + 1;
            }
        }
    }

    fn decrement_indices(&mut self, range: Range<usize>) {
        let Self { indices, entries } = self;
        for i in range {
            if let Some(pos) = indices.get_mut(entries[i].hash, |&j| j == i) {
                *pos = i - 1;
            }
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        let Self { indices, entries } = self;
        indices.reserve(additional, |&i| entries[i].hash);
        self.entries.reserve(additional)
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity().min(self.entries.capacity())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> Iter<K, V> {
        Iter(self.entries.iter())
    }

    /// Keys are handed out by shared reference only, so nothing can disturb their hash.
    pub fn iter_mut(&mut self) -> IterMut<K, V> {
        IterMut(self.entries.iter_mut())
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.entries.clear();
    }
}

impl<K, V> IntoIterator for RawOrderedMap<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.entries.into_iter())
    }
}

pub struct IntoIter<K, V>(std::vec::IntoIter<Bucket<K, V>>);

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|b| (b.key, b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|b| (b.key, b.value))
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Iter<'a, K, V>(core::slice::Iter<'a, Bucket<K, V>>);

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|b| (&b.key, &b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}
impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|b| (&b.key, &b.value))
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

pub struct IterMut<'a, K, V>(core::slice::IterMut<'a, Bucket<K, V>>);

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|b| (&b.key, &mut b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {}
impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|b| (&b.key, &mut b.value))
    }
}

impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}
