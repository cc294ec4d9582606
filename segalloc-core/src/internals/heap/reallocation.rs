//! Reallocation Engine.
//!
//! The last block of the region is resized in place:
//!
//! -   Shrinking splits off the tail, which becomes the new last block, free.
//! -   Growing requests exactly the missing bytes from the region.
//!
//! Any other block is moved: a new block is allocated, the payload copied, and the old block released. A block which
//! already has the required size is left untouched, wherever it is.
//!
//! On failure, the original block is left untouched.

use crate::{AllocError, Configuration, Properties, Region};

use super::{BlockOffset, HeapCore, Tag};

impl<C> HeapCore<C>
    where
        C: Configuration
{
    /// Resizes used `block` so it can hold `size` bytes of payload.
    ///
    /// Returns None if `size` is 0, in which case `block` is released.
    pub(crate) fn resize<R: Region>(&mut self, region: &mut R, block: BlockOffset, size: usize)
        -> Result<Option<BlockOffset>, AllocError>
    {
        if size == 0 {
            self.release(block);
            return Ok(None);
        }

        let tag = self.arena.tag(block);
        let current = tag.size();
        let required = Properties::<C>::block_size(size).ok_or(AllocError::OutOfMemory)?;

        debug_assert!(tag.is_used(), "Resize of free block {:#x}", block.value());

        if required == current {
            return Ok(Some(block));
        }

        if Some(block) == self.last {
            if required < current {
                self.shrink_last(block, required);
            } else {
                self.grow(region, required - current)?;
                self.arena.set_tag(block, Tag::used(required, tag.is_prev_free()));
            }

            trace!("Resized last block at {:#x} from {} to {} bytes", block.value(), current, required);

            return Ok(Some(block));
        }

        let moved = match self.allocate(region, size)? {
            Some(moved) => moved,
            None => unreachable!("Non-zero size yields a block"),
        };

        let count = Properties::<C>::payload_size(current).min(size);
        self.arena.copy(block.payload(), moved.payload(), count);

        self.release(block);

        trace!("Moved block at {:#x} to {:#x}, copying {} bytes", block.value(), moved.value(), count);

        Ok(Some(moved))
    }

    //  Internal; shrinks the last block to `required` bytes, the tail becoming the new, free, last block.
    fn shrink_last(&mut self, block: BlockOffset, required: usize) {
        let tag = self.arena.tag(block);
        let tail = block.forward(required);

        self.arena.set_tag(block, Tag::used(required, tag.is_prev_free()));

        self.arena.write_tags(tail, Tag::free(tag.size() - required));
        self.lists.insert(&mut self.arena, tail);

        self.last = Some(tail);
    }
}
