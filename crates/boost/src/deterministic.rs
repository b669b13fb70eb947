//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG and split tie-breaking so that identical input
//! and seed always yield an identical ensemble.

use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness.
/// 64-bit state with Knuth's MMIX constants; only the high 32 bits are emitted.
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
    const INCREMENT: u64 = 1_442_695_040_888_963_407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // Discard the first output so nearby seeds diverge immediately
        rng.next_u32();
        rng
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        (self.state.0 >> 32) as u32
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }

    /// Random permutation of `0..n`
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        self.shuffle(&mut order);
        order
    }
}

/// Deterministic tie-breaker for split selection
/// Returns consistent ordering based on (feature_idx, border_idx, node_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub border_idx: usize,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, border_idx: usize, node_id: usize) -> Self {
        Self {
            feature_idx,
            border_idx,
            node_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_lcg_different_seeds() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(43);
        let a: Vec<u32> = (0..8).map(|_| rng1.next_u32()).collect();
        let b: Vec<u32> = (0..8).map(|_| rng2.next_u32()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..1000 {
            let val = rng.next_range(10);
            assert!(val < 10);
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_permutation_is_complete() {
        let mut rng = LcgRng::new(42);
        let mut perm = rng.permutation(100);
        assert_ne!(perm, (0..100).collect::<Vec<_>>());
        perm.sort_unstable();
        assert_eq!(perm, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100, 0);
        let t2 = SplitTieBreaker::new(0, 100, 1);
        let t3 = SplitTieBreaker::new(1, 50, 0);

        assert!(t1 < t2);
        assert!(t1 < t3);
    }
}
