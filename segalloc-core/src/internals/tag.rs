//! Boundary Tags
//!
//! A Tag packs the size of a block, and its flags, in a single 32-bits word.
//!
//! Block sizes are always multiples of the alignment unit, hence at least 16, and their lowest bits are always 0; those
//! bits are used to store the flags:
//!
//! -   Bit 0: whether the block is in use.
//! -   Bit 1: whether the previous block, by address, is free.
//! -   Bit 2: reserved.
//!
//! Every block starts with a leading Tag, and a free block also ends with a trailing Tag, identical to its leading one.
//! A used block has no trailing tag; instead, the block following it does not set its previous-free flag.

use core::{mem, num::NonZeroU32};

use super::arena::Arena;

/// Size of a Tag, in bytes.
pub(crate) const TAG_SIZE: usize = mem::size_of::<u32>();

/// The offset of a block, from the start of the region.
///
/// The offset of a block is never 0, as the first block starts after a small alignment prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) struct BlockOffset(NonZeroU32);

impl BlockOffset {
    /// Creates an instance.
    ///
    /// #   Panics
    ///
    /// If `offset` is 0, or does not fit in 32 bits.
    pub(crate) fn new(offset: usize) -> Self {
        assert!(offset <= u32::MAX as usize, "Offset {:#x} exceeds 32 bits", offset);

        Self::from_raw(offset as u32).expect("Non-zero offset")
    }

    /// Creates an instance from its raw representation, None if 0.
    pub(crate) fn from_raw(raw: u32) -> Option<Self> { NonZeroU32::new(raw).map(BlockOffset) }

    /// Returns the raw representation.
    pub(crate) fn into_raw(self) -> u32 { self.0.get() }

    /// Returns the offset.
    pub(crate) fn value(&self) -> usize { self.0.get() as usize }

    /// Returns the offset `bytes` further.
    pub(crate) fn forward(&self, bytes: usize) -> Self { Self::new(self.value() + bytes) }

    /// Returns the offset `bytes` before.
    pub(crate) fn backward(&self, bytes: usize) -> Self { Self::new(self.value() - bytes) }

    /// Returns the offset of the payload of the block.
    pub(crate) fn payload(&self) -> usize { self.value() + TAG_SIZE }

    /// Returns the block whose payload is at `payload`.
    pub(crate) fn from_payload(payload: usize) -> Self { Self::new(payload - TAG_SIZE) }
}

/// Tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Tag(u32);

impl Tag {
    /// Creates the Tag of a used block.
    pub(crate) fn used(size: usize, prev_free: bool) -> Self { Self::new(size, USED | Self::prev_free_bit(prev_free)) }

    /// Creates the Tag of a free block.
    ///
    /// A free block is never preceded by a free block, hence its previous-free flag is always clear.
    pub(crate) fn free(size: usize) -> Self { Self::new(size, 0) }

    /// Creates an instance from its raw representation.
    pub(crate) fn from_raw(raw: u32) -> Self { Self(raw) }

    /// Returns the raw representation.
    pub(crate) fn into_raw(self) -> u32 { self.0 }

    /// Returns the size of the block, in bytes.
    pub(crate) fn size(&self) -> usize { (self.0 & !FLAGS) as usize }

    /// Returns whether the block is in use.
    pub(crate) fn is_used(&self) -> bool { self.0 & USED != 0 }

    /// Returns whether the block is free.
    pub(crate) fn is_free(&self) -> bool { !self.is_used() }

    /// Returns whether the previous block is free.
    pub(crate) fn is_prev_free(&self) -> bool { self.0 & PREV_FREE != 0 }

    /// Returns a copy, with the previous-free flag set as specified.
    pub(crate) fn with_prev_free(self, prev_free: bool) -> Self {
        Self((self.0 & !PREV_FREE) | Self::prev_free_bit(prev_free))
    }

    fn new(size: usize, flags: u32) -> Self {
        debug_assert!(size <= u32::MAX as usize, "{:#x}", size);
        debug_assert!(size as u32 & FLAGS == 0, "{:#x}", size);

        Self(size as u32 | flags)
    }

    fn prev_free_bit(prev_free: bool) -> u32 { if prev_free { PREV_FREE } else { 0 } }
}

impl Arena {
    /// Reads the leading tag of `block`.
    pub(crate) fn tag(&self, block: BlockOffset) -> Tag { Tag::from_raw(self.read_word(block.value())) }

    /// Overwrites the leading tag of `block`, and only the leading tag.
    pub(crate) fn set_tag(&mut self, block: BlockOffset, tag: Tag) { self.write_word(block.value(), tag.into_raw()); }

    /// Reads the trailing tag of free `block`, as indicated by its leading tag.
    pub(crate) fn trailing_tag(&self, block: BlockOffset) -> Tag {
        let size = self.tag(block).size();

        Tag::from_raw(self.read_word(block.value() + size - TAG_SIZE))
    }

    /// Writes the tags of `block`: the leading tag, and if free, the trailing tag.
    pub(crate) fn write_tags(&mut self, block: BlockOffset, tag: Tag) {
        self.set_tag(block, tag);

        if tag.is_free() {
            self.write_word(block.value() + tag.size() - TAG_SIZE, tag.into_raw());
        }
    }

    /// Sets, or clears, the previous-free flag of `block`.
    pub(crate) fn set_prev_free(&mut self, block: BlockOffset, prev_free: bool) {
        let tag = self.tag(block).with_prev_free(prev_free);
        self.set_tag(block, tag);
    }

    /// Reads the trailing tag of the block preceding `block`.
    ///
    /// Only meaningful if the preceding block is free.
    pub(crate) fn preceding_trailing_tag(&self, block: BlockOffset) -> Tag {
        Tag::from_raw(self.read_word(block.value() - TAG_SIZE))
    }
}

//
//  Implementation
//

const USED: u32 = 0b001;
const PREV_FREE: u32 = 0b010;
const FLAGS: u32 = 0b111;

#[cfg(test)]
mod tests {

use core::ptr::NonNull;

use super::*;

#[repr(align(16))]
struct Store([u32; 32]);

impl Store {
    fn arena(&mut self) -> Arena {
        let len = mem::size_of_val(&self.0);

        //  Safety:
        //  -   The store is borrowed for the duration of the test.
        unsafe { Arena::new(NonNull::from(&mut self.0).cast(), len) }
    }
}

#[test]
fn block_offset_new() {
    let block = BlockOffset::new(12);

    assert_eq!(12, block.value());
    assert_eq!(12, block.into_raw());
    assert_eq!(16, block.payload());
    assert_eq!(block, BlockOffset::from_payload(16));

    assert_eq!(44, block.forward(32).value());
    assert_eq!(12, block.forward(32).backward(32).value());

    assert_eq!(None, BlockOffset::from_raw(0));
    assert_eq!(Some(block), BlockOffset::from_raw(12));
}

#[test]
#[should_panic]
fn block_offset_new_zero() {
    BlockOffset::new(0);
}

#[test]
fn tag_used() {
    let tag = Tag::used(48, false);

    assert_eq!(48, tag.size());
    assert!(tag.is_used());
    assert!(!tag.is_free());
    assert!(!tag.is_prev_free());
    assert_eq!(0b110001, tag.into_raw());

    let tag = Tag::used(48, true);

    assert_eq!(48, tag.size());
    assert!(tag.is_used());
    assert!(tag.is_prev_free());
    assert_eq!(0b110011, tag.into_raw());
}

#[test]
fn tag_free() {
    let tag = Tag::free(1 << 20);

    assert_eq!(1 << 20, tag.size());
    assert!(tag.is_free());
    assert!(!tag.is_prev_free());
    assert_eq!(1 << 20, tag.into_raw());
}

#[test]
fn tag_with_prev_free() {
    let tag = Tag::used(32, false);

    let set = tag.with_prev_free(true);
    assert!(set.is_prev_free());
    assert!(set.is_used());
    assert_eq!(32, set.size());

    let cleared = set.with_prev_free(false);
    assert_eq!(tag, cleared);

    assert_eq!(set, set.with_prev_free(true));
}

#[test]
fn tag_size_ignores_reserved_bit() {
    let tag = Tag::from_raw(64 | 0b101);

    assert_eq!(64, tag.size());
    assert!(tag.is_used());
    assert!(!tag.is_prev_free());
}

#[test]
fn arena_write_tags_used() {
    let mut store = Store([0; 32]);
    let mut arena = store.arena();

    let block = BlockOffset::new(12);
    arena.write_tags(block, Tag::used(32, true));

    assert_eq!(Tag::used(32, true), arena.tag(block));
    //  No trailing tag for used blocks.
    assert_eq!(0, arena.read_word(40));
}

#[test]
fn arena_write_tags_free() {
    let mut store = Store([0; 32]);
    let mut arena = store.arena();

    let block = BlockOffset::new(12);
    arena.write_tags(block, Tag::free(48));

    assert_eq!(Tag::free(48), arena.tag(block));
    assert_eq!(Tag::free(48), arena.trailing_tag(block));
    assert_eq!(Tag::free(48), arena.preceding_trailing_tag(block.forward(48)));
}

#[test]
fn arena_set_prev_free() {
    let mut store = Store([0; 32]);
    let mut arena = store.arena();

    let block = BlockOffset::new(28);
    arena.write_tags(block, Tag::used(16, false));

    arena.set_prev_free(block, true);
    assert_eq!(Tag::used(16, true), arena.tag(block));

    arena.set_prev_free(block, false);
    assert_eq!(Tag::used(16, false), arena.tag(block));
}

}
