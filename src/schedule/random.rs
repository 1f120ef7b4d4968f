use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Source of the shuffles used when drawing members for a weekend.
///
/// Production callers hand in an entropy-backed [`RngSource`]; tests can pin
/// the order with a seeded source or with [`InOrder`].
pub trait RandomSource {
    fn shuffle<T>(&mut self, items: &mut [T]);
}

/// Adapts any `rand::Rng` into a [`RandomSource`]
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

/// Leaves every slice in its original order
#[derive(Debug, Clone, Copy, Default)]
pub struct InOrder;

impl RandomSource for InOrder {
    fn shuffle<T>(&mut self, _items: &mut [T]) {}
}
