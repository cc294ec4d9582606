//! Heap Core
//!
//! The HeapCore ties together the Arena, the FreeLists, and the reference to the last block of the region.
//!
//! The region is laid out as a small alignment prefix, followed by blocks, back to back, up to its high end:
//!
//! ```text
//! [PREFIX] [BLOCK 0] [BLOCK 1] ... [LAST BLOCK]
//! ```
//!
//! The allocation, deallocation, and reallocation engines are implemented in sub-modules.

mod allocation;
mod deallocation;
mod reallocation;

#[cfg(test)]
pub(crate) mod test;

use core::{marker::PhantomData, ptr::NonNull};

use crate::{AllocError, BlockInfo, Configuration, Corruption, Properties, Region, SizeClass, utils};

use super::{
    arena::Arena,
    free_lists::FreeLists,
    tag::{BlockOffset, Tag, TAG_SIZE},
};

/// HeapCore.
pub(crate) struct HeapCore<C> {
    arena: Arena,
    last: Option<BlockOffset>,
    lists: FreeLists<C>,
    _configuration: PhantomData<fn() -> C>,
}

impl<C> HeapCore<C>
    where
        C: Configuration
{
    /// Creates an instance, growing `region` by the alignment prefix.
    ///
    /// Returns an error if the region cannot be grown, or if its start is not suitably aligned.
    pub(crate) fn new<R: Region>(region: &mut R) -> Result<Self, AllocError> {
        assert!(Properties::<C>::is_valid(), "Invalid Configuration");

        let prefix = Properties::<C>::first_block_offset();

        //  Safety:
        //  -   `prefix` is non-zero, as the alignment is at least 16.
        let base = unsafe { region.grow(prefix) }.ok_or(AllocError::OutOfMemory)?;

        if !utils::is_sufficiently_aligned_for(base, C::ALIGNMENT) {
            warn!("Region start {:?} is not aligned on {}", base, C::ALIGNMENT.value());
            return Err(AllocError::OutOfMemory);
        }

        debug!("Region initialized at {:?}", base);

        //  Safety:
        //  -   `region` guarantees exclusive access to `[base, base + prefix)`.
        //  -   `base` is aligned on the alignment unit, hence on `u32`.
        let arena = unsafe { Arena::new(base, prefix) };

        Ok(Self { arena, last: None, lists: FreeLists::new(), _configuration: PhantomData })
    }

    /// Returns the size of the region, in bytes, prefix included.
    pub(crate) fn region_size(&self) -> usize { self.arena.len() }

    /// Returns the block whose payload is pointed to by `pointer`.
    ///
    /// #   Panics
    ///
    /// If `pointer` does not point within the region.
    pub(crate) fn block_of(&self, pointer: NonNull<u8>) -> BlockOffset {
        BlockOffset::from_payload(self.arena.offset_of(pointer))
    }

    /// Returns the pointer to the payload of `block`.
    pub(crate) fn payload_of(&self, block: BlockOffset) -> NonNull<u8> { self.arena.pointer(block.payload()) }

    /// Zeroes the first `count` bytes of the payload of `block`.
    ///
    /// #   Panics
    ///
    /// If `count` exceeds the payload of `block`.
    pub(crate) fn zero_payload(&mut self, block: BlockOffset, count: usize) {
        assert!(count <= Properties::<C>::payload_size(self.arena.tag(block).size()));

        self.arena.zero(block.payload(), count);
    }

    /// Returns the tag of `block`.
    pub(crate) fn tag(&self, block: BlockOffset) -> Tag { self.arena.tag(block) }

    /// Returns the last block, if any.
    #[cfg(test)]
    pub(crate) fn last(&self) -> Option<BlockOffset> { self.last }

    /// Returns the first block, if any.
    pub(crate) fn first(&self) -> Option<BlockOffset> {
        self.last.map(|_| BlockOffset::new(Properties::<C>::first_block_offset()))
    }

    /// Returns the block following `block`, unless `block` is the last one.
    pub(crate) fn next_block(&self, block: BlockOffset) -> Option<BlockOffset> {
        if Some(block) == self.last {
            return None;
        }

        Some(block.forward(self.arena.tag(block).size()))
    }

    /// Returns the block preceding `block`, if it is free.
    ///
    /// Used blocks have no trailing tag, hence the preceding block can only be located if free.
    pub(crate) fn prev_free_block(&self, block: BlockOffset) -> Option<BlockOffset> {
        if Some(block) == self.first() || !self.arena.tag(block).is_prev_free() {
            return None;
        }

        Some(block.backward(self.arena.preceding_trailing_tag(block).size()))
    }

    /// Returns information about `block`.
    pub(crate) fn info(&self, block: BlockOffset) -> BlockInfo {
        let tag = self.arena.tag(block);

        BlockInfo {
            offset: block.value(),
            size: tag.size(),
            is_used: tag.is_used(),
            is_prev_free: tag.is_prev_free(),
        }
    }

    /// Walks the region, checking its consistency.
    ///
    /// Checks that:
    /// -   Every block has a valid size, and the blocks tile the region.
    /// -   Every free block has matching leading and trailing tags.
    /// -   Every previous-free flag matches the state of the previous block.
    /// -   No two free blocks are adjacent.
    /// -   The free blocks are exactly the blocks indexed by the free lists.
    pub(crate) fn verify(&self, verbose: bool) -> Result<(), Corruption> {
        let mut current = self.first();
        let mut previous_free = false;
        let mut number_free = 0;
        let mut end = Properties::<C>::first_block_offset();

        while let Some(block) = current {
            let offset = block.value();

            if offset + TAG_SIZE > self.arena.len() {
                return Err(Corruption::RegionEnd { offset, size: self.arena.len() });
            }

            let tag = self.arena.tag(block);

            if verbose {
                debug!("Block {:#x}: size {}, used {}, prev-free {}",
                    offset, tag.size(), tag.is_used(), tag.is_prev_free());
            }

            if tag.size() == 0 || tag.size() % C::ALIGNMENT != 0 || tag.size() > self.arena.len() - offset {
                return Err(Corruption::BadSize { offset });
            }

            if tag.is_prev_free() != previous_free {
                return Err(Corruption::PrevFreeMismatch { offset });
            }

            if tag.is_free() {
                if verbose {
                    debug!("Block {:#x}: prev {:?}, next {:?}",
                        offset, self.arena.prev_link(block), self.arena.next_link(block));
                }

                if self.arena.trailing_tag(block) != tag {
                    return Err(Corruption::TagMismatch { offset });
                }

                if previous_free {
                    return Err(Corruption::AdjacentFree { offset });
                }

                if !self.is_indexed(block) {
                    return Err(Corruption::UnindexedFree { offset });
                }

                number_free += 1;
            }

            previous_free = tag.is_free();
            end = offset + tag.size();
            current = self.next_block(block);
        }

        if end != self.arena.len() {
            return Err(Corruption::RegionEnd { offset: end, size: self.arena.len() });
        }

        let number_indexed: usize = (0..SizeClass::NUMBER_CLASSES)
            .filter_map(SizeClass::new)
            .map(|class| self.lists.iter(&self.arena, class).take(number_free + 1).count())
            .sum();

        if number_indexed != number_free {
            return Err(Corruption::UnindexedFree { offset: end });
        }

        Ok(())
    }

    //  Internal; grows the region by `delta` bytes, returning the offset of the extension.
    fn grow<R: Region>(&mut self, region: &mut R, delta: usize) -> Result<usize, AllocError> {
        debug_assert!(delta > 0 && delta % C::ALIGNMENT == 0, "{}", delta);

        let offset = self.arena.len();

        if delta > C::MAX_REGION_SIZE - offset {
            warn!("Region of {} bytes cannot grow by {} bytes", offset, delta);
            return Err(AllocError::OutOfMemory);
        }

        //  Safety:
        //  -   `delta` is non-zero.
        let extension = match unsafe { region.grow(delta) } {
            Some(extension) => extension,
            None => {
                warn!("Region of {} bytes failed to grow by {} bytes", offset, delta);
                return Err(AllocError::OutOfMemory);
            },
        };

        debug!("Region grown from {} by {} bytes", offset, delta);

        //  Safety:
        //  -   `region` guarantees contiguity and exclusive access.
        unsafe { self.arena.extend(extension, delta) };

        Ok(offset)
    }

    //  Internal; returns whether `block` is reachable from the list of its size class.
    fn is_indexed(&self, block: BlockOffset) -> bool {
        let class = Properties::<C>::size_class(self.arena.tag(block).size());

        //  Bounded, in case the links form a cycle.
        let bound = self.arena.len() / C::ALIGNMENT.value() + 1;

        self.lists.iter(&self.arena, class).take(bound).any(|candidate| candidate == block)
    }
}
