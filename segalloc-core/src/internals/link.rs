//! Offset-Compressed Links
//!
//! A free block links to its neighbours within its free list. Rather than full pointers, the links are stored as
//! 32-bits offsets from the start of the region, halving their footprint on 64-bits platforms.
//!
//! The absence of a link is encoded as 0, which is never the offset of a block.

use super::{arena::Arena, tag::{BlockOffset, TAG_SIZE}};

/// Encodes a link.
pub(crate) fn encode(link: Option<BlockOffset>) -> u32 { link.map_or(0, BlockOffset::into_raw) }

/// Decodes a link.
pub(crate) fn decode(raw: u32) -> Option<BlockOffset> { BlockOffset::from_raw(raw) }

impl Arena {
    /// Returns the next free block in the list of free `block`, if any.
    pub(crate) fn next_link(&self, block: BlockOffset) -> Option<BlockOffset> {
        decode(self.read_word(block.value() + NEXT))
    }

    /// Returns the previous free block in the list of free `block`, if any.
    pub(crate) fn prev_link(&self, block: BlockOffset) -> Option<BlockOffset> {
        decode(self.read_word(block.value() + PREV))
    }

    /// Links free `block` to `next`.
    pub(crate) fn set_next_link(&mut self, block: BlockOffset, next: Option<BlockOffset>) {
        self.write_word(block.value() + NEXT, encode(next));
    }

    /// Links free `block` to `prev`.
    pub(crate) fn set_prev_link(&mut self, block: BlockOffset, prev: Option<BlockOffset>) {
        self.write_word(block.value() + PREV, encode(prev));
    }
}

//
//  Implementation
//

//  The links immediately follow the leading tag.
const NEXT: usize = TAG_SIZE;
const PREV: usize = 2 * TAG_SIZE;
