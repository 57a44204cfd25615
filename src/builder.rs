use core::hash::BuildHasher;
use core::marker::PhantomData;
use std::sync::Arc;

use log::trace;

use crate::config::Config;
use crate::hash::DefaultHashBuilder;
use crate::map::OrderedMap;
use crate::sync::{Comparator, OrderedContainer};

/// Construction options for an [`OrderedContainer`].
///
/// Options apply in the order they are called; calling one again replaces the earlier setting.
///
/// ```
/// use orderedmap::OrderedContainer;
///
/// let flags = OrderedContainer::<String, bool>::builder()
///     .capacity_hint(64)
///     .default_comparator(|a: &String, b: &String| a.len() < b.len())
///     .build();
///
/// flags.set("dark-mode".to_string(), true);
/// flags.set("beta".to_string(), false);
///
/// let sorted = flags.sorted_pairs(None).unwrap();
/// assert_eq!(sorted[0].0, "beta");
/// ```
pub struct Builder<K, V, S = DefaultHashBuilder> {
    capacity: usize,
    less: Option<Comparator<K>>,
    hasher: S,
    _values: PhantomData<fn() -> V>,
}

impl<K, V> Builder<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::new())
    }
}

impl<K, V> Default for Builder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Builder<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            capacity: 0,
            less: None,
            hasher,
            _values: PhantomData,
        }
    }

    /// Pre-sizes storage for `n` entries. `0` means "no hint" and leaves any earlier hint alone.
    pub fn capacity_hint(mut self, n: usize) -> Self {
        if n > 0 {
            self.capacity = n;
        }
        self
    }

    /// Registers the comparator `sorted_pairs` uses when it is not given one.
    ///
    /// `less` must be a strict weak ordering over keys.
    pub fn default_comparator<F>(mut self, less: F) -> Self
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        self.less = Some(Arc::new(less));
        self
    }

    /// Replaces the hasher builder.
    pub fn hasher<T>(self, hasher: T) -> Builder<K, V, T> {
        Builder {
            capacity: self.capacity,
            less: self.less,
            hasher,
            _values: PhantomData,
        }
    }

    /// Applies a loaded [`Config`]: its capacity hint, then its key order if it names one.
    pub fn config(self, config: &Config) -> Self
    where
        K: Ord + 'static,
    {
        let builder = self.capacity_hint(config.capacity);
        match config.order {
            Some(order) => builder.default_comparator(order.less::<K>()),
            None => builder,
        }
    }

    pub fn build(self) -> OrderedContainer<K, V, S>
    where
        S: BuildHasher,
    {
        if self.capacity > 0 {
            trace!("pre-sizing ordered container for {} entries", self.capacity);
        }

        OrderedContainer::from_parts(
            OrderedMap::with_capacity_and_hasher(self.capacity, self.hasher),
            self.less,
        )
    }
}
