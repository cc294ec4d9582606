//! A small, reproducible, pseudo-random number generator.

/// Rng, a xorshift64 generator.
///
/// Not suitable for anything but generating test inputs; on the other hand, the same seed always produces the same
/// sequence, on any platform.
#[derive(Clone, Debug)]
pub struct Rng(u64);

impl Rng {
    /// Creates an instance from `seed`.
    ///
    /// A 0 seed, which xorshift cannot escape from, is replaced by an arbitrary constant.
    pub fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    /// Returns the next number of the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Returns a number in `[0, bound)`.
    ///
    /// #   Panics
    ///
    /// If `bound` is 0.
    pub fn below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "Empty range");

        (self.next_u64() % (bound as u64)) as usize
    }

    /// Returns a number in `[low, high]`.
    ///
    /// #   Panics
    ///
    /// If `low > high`.
    pub fn between(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "{} > {}", low, high);

        low + self.below(high - low + 1)
    }

    /// Returns true with a probability of `percent`%.
    pub fn chance(&mut self, percent: usize) -> bool { self.below(100) < percent }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn rng_reproducible() {
    let mut left = Rng::new(42);
    let mut right = Rng::new(42);

    for _ in 0..100 {
        assert_eq!(left.next_u64(), right.next_u64());
    }
}

#[test]
fn rng_zero_seed() {
    let mut rng = Rng::new(0);

    assert_ne!(0, rng.next_u64());
}

#[test]
fn rng_between() {
    let mut rng = Rng::new(7);

    for _ in 0..1_000 {
        let n = rng.between(3, 5);
        assert!(n >= 3 && n <= 5, "{}", n);
    }

    assert_eq!(9, rng.between(9, 9));
}

}
