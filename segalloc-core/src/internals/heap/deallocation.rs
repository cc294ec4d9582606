//! Deallocation Engine.
//!
//! A released block is eagerly coalesced with its free neighbours. A neighbour which does not exist, at either end of
//! the region, is treated as used. This leaves 4 cases:
//!
//! ```text
//! 1.  [USED] [BLOCK] [USED]   No merge.
//! 2.  [USED] [BLOCK] [FREE]   Merge with the next block.
//! 3.  [FREE] [BLOCK] [USED]   Merge with the previous block.
//! 4.  [FREE] [BLOCK] [FREE]   Merge with both.
//! ```
//!
//! The merged block is then tagged as free, and pushed onto the free list of its size class.

use crate::Configuration;

use super::{BlockOffset, HeapCore, Tag};

impl<C> HeapCore<C>
    where
        C: Configuration
{
    /// Releases used `block`, coalescing it with its free neighbours.
    pub(crate) fn release(&mut self, block: BlockOffset) {
        let tag = self.arena.tag(block);

        debug_assert!(tag.is_used(), "Double release of {:#x}", block.value());

        let prev = self.prev_free_block(block);
        let next = self.next_block(block);
        let next_free = next.filter(|&next| self.arena.tag(next).is_free());

        let mut start = block;
        let mut size = tag.size();

        match (prev, next_free) {
            (None, None) => {
                if let Some(next) = next {
                    self.arena.set_prev_free(next, true);
                }
            },
            (None, Some(next)) => {
                size += self.arena.tag(next).size();

                if Some(next) == self.last {
                    self.last = Some(block);
                }

                self.lists.remove(&mut self.arena, next);
            },
            (Some(prev), None) => {
                size += self.arena.tag(prev).size();

                if Some(block) == self.last {
                    self.last = Some(prev);
                }

                if let Some(next) = next {
                    self.arena.set_prev_free(next, true);
                }

                start = prev;
                self.lists.remove(&mut self.arena, prev);
            },
            (Some(prev), Some(next)) => {
                size += self.arena.tag(prev).size() + self.arena.tag(next).size();

                if Some(next) == self.last {
                    self.last = Some(prev);
                }

                start = prev;
                self.lists.remove(&mut self.arena, prev);
                self.lists.remove(&mut self.arena, next);
            },
        }

        self.arena.write_tags(start, Tag::free(size));
        self.lists.insert(&mut self.arena, start);

        trace!("Released block at {:#x}, into free block of {} bytes at {:#x}", block.value(), size, start.value());
    }
}
