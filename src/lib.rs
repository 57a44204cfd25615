//! Insertion-ordered hash maps.
//!
//! [`OrderedContainer`] is a map that any number of threads can read and write through a
//! shared reference. It remembers the order keys were first inserted in, looks keys up in
//! constant time, lets callers place a new key directly before or after an existing one,
//! and hands out sorted copies of its contents without disturbing the stored order.
//!
//! [`OrderedMap`] is the same structure without the lock, for single-threaded use.
//!
//! ```
//! use orderedmap::{Error, OrderedContainer};
//!
//! let rules = OrderedContainer::builder()
//!     .default_comparator(|a: &&str, b: &&str| a < b)
//!     .build();
//!
//! rules.set("deny-all", 0);
//! rules.insert_before(&"deny-all", "allow-health", 2)?;
//! rules.set("audit", 1);
//!
//! // Evaluation order is the order rules were placed in...
//! assert_eq!(rules.keys(), ["allow-health", "deny-all", "audit"]);
//!
//! // ...while a sorted view is available on demand.
//! let sorted: Vec<_> = rules.sorted_pairs(None)?.into_iter().map(|(k, _)| k).collect();
//! assert_eq!(sorted, ["allow-health", "audit", "deny-all"]);
//!
//! assert_eq!(rules.insert_after(&"missing", "x", 9), Err(Error::TargetNotFound));
//! # Ok::<(), Error>(())
//! ```
//!
//! # Locking
//!
//! A single [`parking_lot::RwLock`] guards each container. Lookups and snapshots share it;
//! mutations take it exclusively. [`OrderedContainer::sorted_pairs`] only holds the lock
//! while copying, and sorts afterwards.
//!
//! The update function passed to [`OrderedContainer::upsert`] runs while the write lock is
//! held and must not call back into the same container.

mod builder;
mod config;
mod error;
mod hash;
pub mod map;
mod rand;
mod sort;
mod sync;

pub use builder::Builder;
pub use config::{Config, KeyOrder};
pub use error::{Error, Result};
pub use hash::{DefaultHashBuilder, RandomState, SipHasher};
pub use map::OrderedMap;
pub use sync::{Comparator, OrderedContainer};
