use core::hash::BuildHasher;

pub use lccc_siphash::SipHasher;

use crate::rand::Rand;

/// Randomly keyed SipHash-`C`-`D` hasher builder.
///
/// Each value draws fresh keys, so two maps never share a hash layout.
#[derive(Clone, Debug)]
pub struct RandomState<const C: usize, const D: usize>(u64, u64);

/// The hasher builder used when no other is named: SipHash-2-4.
pub type DefaultHashBuilder = RandomState<2, 4>;

impl<const C: usize, const D: usize> Default for RandomState<C, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize, const D: usize> RandomState<C, D> {
    pub fn new() -> RandomState<C, D> {
        Self(Rand::thread_gen(), Rand::thread_gen())
    }

    pub const fn with_keys(k0: u64, k1: u64) -> RandomState<C, D> {
        Self(k0, k1)
    }
}

impl<const C: usize, const D: usize> BuildHasher for RandomState<C, D> {
    type Hasher = SipHasher<C, D>;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(self.0, self.1)
    }
}
