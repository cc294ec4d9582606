//! An integer guaranteed to be a PowerOf2.

use core::{num, ops};

/// PowerOf2
///
/// An integral guaranteed to be non-zero and a power of 2.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PowerOf2(num::NonZeroUsize);

impl PowerOf2 {
    /// Creates a new instance of PowerOf2.
    ///
    /// Or nothing if the value is not a power of 2.
    pub fn new(value: usize) -> Option<PowerOf2> {
        if value.count_ones() == 1 {
            //  Safety:
            //  -   Value is a power of 2, as per the if check.
            Some(unsafe { PowerOf2::new_unchecked(value) })
        } else {
            None
        }
    }

    /// Creates a new instance of PowerOf2.
    ///
    /// #   Safety
    ///
    /// Assumes that the value is a power of 2.
    pub const unsafe fn new_unchecked(value: usize) -> PowerOf2 {
        //  Safety:
        //  -   A power of 2 cannot be 0.
        PowerOf2(num::NonZeroUsize::new_unchecked(value))
    }

    /// Returns the inner value.
    pub const fn value(&self) -> usize { self.0.get() }

    /// Rounds the value up to the nearest higher multiple of `self`, or None on overflow.
    pub const fn checked_round_up(&self, n: usize) -> Option<usize> {
        let mask = self.mask();

        match n.checked_add(mask) {
            Some(n) => Some(n & !mask),
            None => None,
        }
    }

    /// Returns the number of times `self` fits in `n`, rounded down.
    pub const fn units(&self, n: usize) -> usize { n >> self.bit_index() }

    const fn bit_index(&self) -> usize { self.value().trailing_zeros() as usize }

    const fn mask(&self) -> usize { self.value() - 1 }
}

impl ops::Rem<PowerOf2> for usize {
    type Output = usize;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn rem(self, rhs: PowerOf2) -> usize { self & rhs.mask() }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn power_of_2_new() {
    fn new(value: usize) -> Option<usize> {
        PowerOf2::new(value).map(|p| p.value())
    }

    assert_eq!(None, new(0));
    assert_eq!(Some(1), new(1));
    assert_eq!(None, new(12));
    assert_eq!(Some(16), new(16));
    assert_eq!(None, new(17));
    assert_eq!(Some(32), new(32));
}

#[test]
fn power_of_2_checked_round_up() {
    fn round_up(pow2: usize, n: usize) -> Option<usize> {
        PowerOf2::new(pow2).expect("Power of 2").checked_round_up(n)
    }

    assert_eq!(Some(0), round_up(16, 0));
    assert_eq!(Some(16), round_up(16, 1));
    assert_eq!(Some(16), round_up(16, 16));
    assert_eq!(Some(32), round_up(16, 17));
    assert_eq!(Some(32), round_up(16, 20));
    assert_eq!(Some(112), round_up(16, 104));

    assert_eq!(None, round_up(16, usize::MAX));
    assert_eq!(None, round_up(16, usize::MAX - 14));
    assert_eq!(Some(usize::MAX - 15), round_up(16, usize::MAX - 15));
}

#[test]
fn power_of_2_units() {
    fn units(pow2: usize, n: usize) -> usize {
        PowerOf2::new(pow2).expect("Power of 2").units(n)
    }

    assert_eq!(0, units(16, 0));
    assert_eq!(0, units(16, 15));
    assert_eq!(1, units(16, 16));
    assert_eq!(2, units(16, 32));
    assert_eq!(9, units(16, 144));
    assert_eq!(4, units(32, 144));
}

#[test]
fn power_of_2_rem() {
    fn rem(pow2: usize, n: usize) -> usize {
        n % PowerOf2::new(pow2).expect("Power of 2")
    }

    assert_eq!(0, rem(16, 0));
    assert_eq!(12, rem(16, 12));
    assert_eq!(0, rem(16, 16));
    assert_eq!(12, rem(16, 60));
}

}
