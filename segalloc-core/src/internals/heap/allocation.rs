//! Allocation Engine.
//!
//! A request is served from the free lists whenever possible, using a best-fit search:
//!
//! -   The search starts at the size class of the required block, and proceeds with larger classes.
//! -   Within a class, every block is examined, and the smallest sufficiently large block is remembered.
//! -   The search stops at the first class containing a sufficiently large block.
//!
//! The size classes are disjoint and ordered, hence the best fit of the first class holding a fit is also the best fit
//! overall. The selected block is split, and its tail returned to the free lists.
//!
//! If no block fits, the region is grown by exactly the required block size.

use crate::{AllocError, Configuration, Properties, Region};

use super::{BlockOffset, HeapCore, Tag};

impl<C> HeapCore<C>
    where
        C: Configuration
{
    /// Allocates a block able to hold `size` bytes of payload.
    ///
    /// Returns None if `size` is 0.
    pub(crate) fn allocate<R: Region>(&mut self, region: &mut R, size: usize)
        -> Result<Option<BlockOffset>, AllocError>
    {
        if size == 0 {
            return Ok(None);
        }

        let required = Properties::<C>::block_size(size).ok_or(AllocError::OutOfMemory)?;

        let block = match self.find_fit(required) {
            Some(block) => {
                self.carve(block, required);
                block
            },
            None => self.allocate_fresh(region, required)?,
        };

        trace!("Allocated {} bytes at {:#x}, in block of {} bytes", size, block.value(), required);

        Ok(Some(block))
    }

    //  Internal; returns the best-fitting free block of at least `required` bytes, if any.
    fn find_fit(&self, required: usize) -> Option<BlockOffset> {
        let start = Properties::<C>::size_class(required);

        for class in start.and_larger() {
            let mut best: Option<(BlockOffset, usize)> = None;

            for block in self.lists.iter(&self.arena, class) {
                let size = self.arena.tag(block).size();

                if size >= required && best.map_or(true, |(_, best_size)| size < best_size) {
                    best = Some((block, size));
                }
            }

            if let Some((block, _)) = best {
                return Some(block);
            }
        }

        None
    }

    //  Internal; turns free `block` into a used block of `required` bytes, returning the remainder to the free lists.
    fn carve(&mut self, block: BlockOffset, required: usize) {
        let size = self.arena.tag(block).size();

        debug_assert!(size >= required, "{} < {}", size, required);

        self.lists.remove(&mut self.arena, block);

        //  A free block is never preceded by a free block.
        self.arena.set_tag(block, Tag::used(required, false));

        if size > required {
            let remainder = block.forward(required);

            //  The block following the remainder, if any, already has its previous-free flag set.
            self.arena.write_tags(remainder, Tag::free(size - required));
            self.lists.insert(&mut self.arena, remainder);

            if Some(block) == self.last {
                self.last = Some(remainder);
            }
        } else if let Some(next) = self.next_block(block) {
            self.arena.set_prev_free(next, false);
        }
    }

    //  Internal; grows the region by exactly `required` bytes, and turns the extension into a used block.
    fn allocate_fresh<R: Region>(&mut self, region: &mut R, required: usize) -> Result<BlockOffset, AllocError> {
        let prev_free = self.last.map_or(false, |last| self.arena.tag(last).is_free());

        let block = BlockOffset::new(self.grow(region, required)?);

        self.arena.set_tag(block, Tag::used(required, prev_free));
        self.last = Some(block);

        Ok(block)
    }
}
