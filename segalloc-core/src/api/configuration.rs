//! The configuration of segalloc-core.
//!
//! The Configuration fixes the two numbers the block layout depends upon:
//!
//! -   The alignment unit: every block size is a multiple of it, and every payload is aligned on it.
//! -   The maximum size of the region: it bounds every offset stored in the free lists.
//!
//! Blocks are laid out as follows, with `T` the size of a tag:
//!
//! ```text
//! USED: [TAG (SIZE | FLAGS)] [PAYLOAD ...] [PADDING]
//! FREE: [TAG (SIZE | FLAGS)] [NEXT] [PREV] [...] [TAG (SIZE | FLAGS)]
//! ```
//!
//! The first block starts `ALIGNMENT - T` bytes into the region, so that every payload is aligned.

use core::mem;

use super::PowerOf2;

/// Configuration
///
/// The Configuration instance allows adjusting the alignment unit and the maximum region size.
pub trait Configuration {
    /// The alignment unit of blocks and payloads.
    ///
    /// The minimum this can be is 16, as a free block must accommodate 2 tags and 2 links.
    const ALIGNMENT: PowerOf2;

    /// The maximum size of the region, in bytes.
    ///
    /// The maximum this can be is `u32::MAX`, as free blocks are linked by 32-bits offsets from the region base.
    const MAX_REGION_SIZE: usize;
}

/// SizeClass
///
/// The index of the free list a free block belongs to.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SizeClass(usize);

impl SizeClass {
    /// The number of size classes.
    pub const NUMBER_CLASSES: usize = 5;

    /// Creates a new instance.
    ///
    /// Returns None if `value` is not below `NUMBER_CLASSES`.
    pub fn new(value: usize) -> Option<Self> {
        if value < Self::NUMBER_CLASSES { Some(Self(value)) } else { None }
    }

    /// Returns the underlying value.
    pub const fn value(&self) -> usize { self.0 }

    /// Returns all the size classes from `self` up to the last, included.
    pub fn and_larger(&self) -> impl Iterator<Item = SizeClass> {
        (self.0..Self::NUMBER_CLASSES).map(SizeClass)
    }
}

/// Properties
///
/// Properties of a given Configuration.
///
/// Work-around for the inability to implement static methods directly on a trait.
pub struct Properties<C>(C);

impl<C> Properties<C>
    where
        C: Configuration
{
    /// Returns the size of a tag, in bytes.
    pub fn tag_size() -> usize { TAG_SIZE }

    /// Returns the offset of the first block from the start of the region.
    pub fn first_block_offset() -> usize { C::ALIGNMENT.value() - TAG_SIZE }

    /// Returns the minimum size of a block, in bytes.
    pub fn minimum_block_size() -> usize { C::ALIGNMENT.value() }

    /// Returns whether the Configuration is usable.
    pub fn is_valid() -> bool {
        C::ALIGNMENT.value() >= 4 * TAG_SIZE &&
            C::MAX_REGION_SIZE <= u32::MAX as usize &&
            C::MAX_REGION_SIZE > Self::first_block_offset()
    }

    /// Returns the size of the block required to hold a payload of `size` bytes.
    ///
    /// Returns None if such a block cannot possibly fit within the region.
    pub fn block_size(size: usize) -> Option<usize> {
        let size = size.checked_add(TAG_SIZE)
            .and_then(|size| C::ALIGNMENT.checked_round_up(size))?;

        if size <= C::MAX_REGION_SIZE { Some(size) } else { None }
    }

    /// Returns the size of the payload of a block of `block_size` bytes.
    pub fn payload_size(block_size: usize) -> usize {
        debug_assert!(block_size >= TAG_SIZE);

        block_size - TAG_SIZE
    }

    /// Returns the size class of a block of `block_size` bytes.
    ///
    /// The classes are defined in terms of alignment units:
    ///
    /// -   0: up to 2 units.
    /// -   1: exactly 3 units.
    /// -   2: exactly 4 units.
    /// -   3: 5 to 8 units.
    /// -   4: 9 units or more.
    pub fn size_class(block_size: usize) -> SizeClass {
        debug_assert!(block_size % C::ALIGNMENT == 0, "{} % {}", block_size, C::ALIGNMENT.value());

        match C::ALIGNMENT.units(block_size) {
            0..=2 => SizeClass(0),
            3 => SizeClass(1),
            4 => SizeClass(2),
            5..=8 => SizeClass(3),
            _ => SizeClass(4),
        }
    }
}

//
//  Implementation
//

const TAG_SIZE: usize = mem::size_of::<u32>();

#[cfg(test)]
mod tests {

use super::*;

struct TestConfiguration;

impl Configuration for TestConfiguration {
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(16) };
    const MAX_REGION_SIZE: usize = 1 << 20;
}

struct WideConfiguration;

impl Configuration for WideConfiguration {
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(32) };
    const MAX_REGION_SIZE: usize = u32::MAX as usize;
}

struct NarrowConfiguration;

impl Configuration for NarrowConfiguration {
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(8) };
    const MAX_REGION_SIZE: usize = 1 << 20;
}

struct HugeConfiguration;

impl Configuration for HugeConfiguration {
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(16) };
    const MAX_REGION_SIZE: usize = u32::MAX as usize + 1;
}

type TestProperties = Properties<TestConfiguration>;

#[test]
fn properties_is_valid() {
    assert!(Properties::<TestConfiguration>::is_valid());
    assert!(Properties::<WideConfiguration>::is_valid());

    assert!(!Properties::<NarrowConfiguration>::is_valid());
    assert!(!Properties::<HugeConfiguration>::is_valid());
}

#[test]
fn properties_offsets() {
    assert_eq!(4, TestProperties::tag_size());
    assert_eq!(12, TestProperties::first_block_offset());
    assert_eq!(16, TestProperties::minimum_block_size());

    assert_eq!(28, Properties::<WideConfiguration>::first_block_offset());
}

#[test]
fn properties_block_size() {
    fn block_size(size: usize) -> Option<usize> { TestProperties::block_size(size) }

    assert_eq!(Some(16), block_size(0));
    assert_eq!(Some(16), block_size(1));
    assert_eq!(Some(16), block_size(12));
    assert_eq!(Some(32), block_size(13));
    assert_eq!(Some(32), block_size(16));
    assert_eq!(Some(112), block_size(100));
    assert_eq!(Some(1 << 20), block_size((1 << 20) - 4));

    assert_eq!(None, block_size((1 << 20) - 3));
    assert_eq!(None, block_size(usize::MAX));
    assert_eq!(None, block_size(usize::MAX - 4));
}

#[test]
fn properties_payload_size() {
    assert_eq!(12, TestProperties::payload_size(16));
    assert_eq!(108, TestProperties::payload_size(112));
}

#[test]
fn properties_size_class() {
    fn class(size: usize) -> usize { TestProperties::size_class(size).value() }

    assert_eq!(0, class(16));
    assert_eq!(0, class(32));
    assert_eq!(1, class(48));
    assert_eq!(2, class(64));
    assert_eq!(3, class(80));
    assert_eq!(3, class(128));
    assert_eq!(4, class(144));
    assert_eq!(4, class(1 << 20));

    assert_eq!(0, Properties::<WideConfiguration>::size_class(64).value());
    assert_eq!(1, Properties::<WideConfiguration>::size_class(96).value());
}

#[test]
fn size_class_and_larger() {
    let classes: Vec<_> = SizeClass::new(2).unwrap().and_larger().map(|c| c.value()).collect();
    assert_eq!(vec!(2, 3, 4), classes);

    assert_eq!(None, SizeClass::new(5));
}

}
