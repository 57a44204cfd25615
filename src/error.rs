/// Failures reported by the ordered map and container operations.
///
/// None of these indicate corruption: every check runs before any structural change,
/// so the map is exactly as it was before the failing call.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `sorted_pairs` was given no comparator and none was registered at construction.
    #[error("comparator is required")]
    MissingComparator,
    /// `upsert` hit an existing key but no update function was supplied.
    #[error("upsert requires an update function when the key exists")]
    MissingUpdateFunction,
    /// Positional insertion of a key that is already present.
    #[error("key already exists")]
    DuplicateKey,
    /// Positional insertion relative to a key that is not present.
    #[error("target key not found")]
    TargetNotFound,
}

pub type Result<T> = core::result::Result<T, Error>;
