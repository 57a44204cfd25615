use serde_derive::{Deserialize, Serialize};

/// Serializable construction settings, typically read from a TOML table.
///
/// ```toml
/// capacity = 128
/// order = "descending"
/// ```
///
/// Applied through [`Builder::config`](crate::Builder::config).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Entries to pre-size for; `0` means no hint.
    pub capacity: usize,
    /// Natural key order to register as the default comparator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<KeyOrder>,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyOrder {
    Ascending,
    Descending,
}

impl KeyOrder {
    /// The `less` predicate for this direction of `K`'s natural order.
    pub fn less<K: Ord>(self) -> fn(&K, &K) -> bool {
        match self {
            KeyOrder::Ascending => |a, b| a < b,
            KeyOrder::Descending => |a, b| a > b,
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
