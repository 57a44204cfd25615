use serde::de::{Deserialize, DeserializeSeed, MapAccess, SeqAccess, Visitor};

use core::marker::PhantomData;
use std::hash::{BuildHasher, Hash};

use super::OrderedMap;

/// Deserializes an [`OrderedMap`] that uses a particular hasher.
///
/// Entries keep the order they appear in the input. A key that appears twice keeps its
/// first position and its last value.
pub struct WithHasher<K, V, S>(PhantomData<fn() -> (K, V)>, S);

impl<K, V, S> WithHasher<K, V, S> {
    pub const fn new(hasher: S) -> Self {
        Self(PhantomData, hasher)
    }
}

impl<'de, K: Deserialize<'de> + Hash + Eq, V: Deserialize<'de>, S: BuildHasher> DeserializeSeed<'de>
    for WithHasher<K, V, S>
{
    type Value = OrderedMap<K, V, S>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(WithHasherVisitor(self.0, self.1))
    }
}

struct WithHasherVisitor<K, V, S>(PhantomData<fn() -> (K, V)>, S);

impl<'de, K: Deserialize<'de> + Hash + Eq, V: Deserialize<'de>, S: BuildHasher> Visitor<'de>
    for WithHasherVisitor<K, V, S>
{
    type Value = OrderedMap<K, V, S>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a map, or a sequence of key/value pairs")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let cap = map.size_hint().unwrap_or(0);

        let mut ret = OrderedMap::with_capacity_and_hasher(cap, self.1);

        while let Some((key, val)) = map.next_entry()? {
            ret.insert(key, val);
        }
        Ok(ret)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let cap = seq.size_hint().unwrap_or(0);

        let mut ret = OrderedMap::with_capacity_and_hasher(cap, self.1);

        while let Some((key, val)) = seq.next_element::<(K, V)>()? {
            ret.insert(key, val);
        }
        Ok(ret)
    }
}
