//! Pluggable randomness for seeding and double-duty opponent selection.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Source of random permutations.
pub trait Permuter: Send {
    /// A permutation of `0..len`.
    fn permute(&mut self, len: usize) -> Vec<usize>;
}

/// Uniform shuffling backed by any `rand` generator.
#[derive(Debug)]
pub struct RngPermuter<R> {
    rng: R,
}

impl<R: Rng + Send> RngPermuter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngPermuter<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> Permuter for RngPermuter<R> {
    fn permute(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

/// Keeps the input order. For deterministic tests and replays.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Permuter for Identity {
    fn permute(&mut self, len: usize) -> Vec<usize> {
        (0..len).collect()
    }
}

/// Reorder `items` with `permuter`. A malformed permutation leaves the order unchanged.
pub fn permuted<T: Clone>(permuter: &mut dyn Permuter, items: &[T]) -> Vec<T> {
    let order = permuter.permute(items.len());
    if !is_permutation(&order, items.len()) {
        log::warn!("Permuter returned an invalid permutation of {} items; keeping input order", items.len());
        return items.to_vec();
    }
    order.into_iter().map(|i| items[i].clone()).collect()
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    let mut seen = vec![false; len];
    order.len() == len
        && order
            .iter()
            .all(|&i| i < len && !std::mem::replace(&mut seen[i], true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_permuter_yields_a_permutation() {
        let mut p = RngPermuter::seeded(7);
        let mut order = p.permute(10);
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_permuters_agree() {
        let a = RngPermuter::seeded(42).permute(16);
        let b = RngPermuter::seeded(42).permute(16);
        assert_eq!(a, b);
    }

    struct Broken;

    impl Permuter for Broken {
        fn permute(&mut self, len: usize) -> Vec<usize> {
            vec![0; len]
        }
    }

    #[test]
    fn invalid_permutation_falls_back_to_input_order() {
        assert_eq!(permuted(&mut Broken, &["a", "b", "c"]), vec!["a", "b", "c"]);
        assert_eq!(permuted(&mut Identity, &[3, 1, 2]), vec![3, 1, 2]);
    }
}
