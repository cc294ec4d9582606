//! Errors reported by the Heap.

use core::fmt;

/// AllocError
///
/// The reason an allocation could not be satisfied.
///
/// The Heap is left unchanged whenever an error is returned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AllocError {
    /// The region could not be grown sufficiently, or the request exceeds the maximum size of the region.
    OutOfMemory,
    /// The size of the request overflowed `usize`.
    Overflow,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory => f.write_str("out of memory"),
            AllocError::Overflow => f.write_str("allocation size overflow"),
        }
    }
}

/// Corruption
///
/// An inconsistency detected by walking the region.
///
/// The offsets are relative to the start of the region, and point to the tag of the offending block.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Corruption {
    /// The size of the block is 0, or not a multiple of the alignment unit.
    BadSize {
        /// Offset of the block.
        offset: usize,
    },
    /// The leading and trailing tags of a free block disagree.
    TagMismatch {
        /// Offset of the block.
        offset: usize,
    },
    /// The previous-block-free flag does not match the state of the previous block.
    PrevFreeMismatch {
        /// Offset of the block.
        offset: usize,
    },
    /// Two adjacent blocks are both free.
    AdjacentFree {
        /// Offset of the second block.
        offset: usize,
    },
    /// A free block is not reachable from the free lists, or the free lists hold more blocks than the region.
    UnindexedFree {
        /// Offset of the block.
        offset: usize,
    },
    /// The last block does not end at the end of the region.
    RegionEnd {
        /// Offset at which the walk ended.
        offset: usize,
        /// Size of the region.
        size: usize,
    },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Corruption::BadSize { offset } => write!(f, "invalid block size at {:#x}", offset),
            Corruption::TagMismatch { offset } => write!(f, "leading and trailing tags disagree at {:#x}", offset),
            Corruption::PrevFreeMismatch { offset } => write!(f, "stale previous-free flag at {:#x}", offset),
            Corruption::AdjacentFree { offset } => write!(f, "uncoalesced free block at {:#x}", offset),
            Corruption::UnindexedFree { offset } => write!(f, "free block not indexed at {:#x}", offset),
            Corruption::RegionEnd { offset, size } => write!(f, "walk ended at {:#x}, region ends at {:#x}", offset, size),
        }
    }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn alloc_error_display() {
    assert_eq!("out of memory", AllocError::OutOfMemory.to_string());
    assert_eq!("allocation size overflow", AllocError::Overflow.to_string());
}

#[test]
fn corruption_display() {
    assert_eq!("leading and trailing tags disagree at 0x3c", Corruption::TagMismatch { offset: 60 }.to_string());
    assert_eq!("walk ended at 0x4c, region ends at 0x5c", Corruption::RegionEnd { offset: 76, size: 92 }.to_string());
}

}
