//! Heap
//!
//! The Heap is the allocator proper: it owns a Region, and carves it into blocks on demand.
//!
//! The Heap is not thread-safe; it is up to the user to serialize accesses, if need be.

use core::ptr::NonNull;

use crate::internals::{heap::HeapCore, tag::BlockOffset};

use super::{AllocError, Configuration, Corruption, Properties, Region};

/// Heap.
///
/// All allocation functions return:
/// -   `Ok(Some(pointer))` on success, the pointer aligned on `C::ALIGNMENT`.
/// -   `Ok(None)` when no memory is requested, that is when the size is 0.
/// -   `Err(error)` on failure, in which case the Heap is left unchanged.
pub struct Heap<C, R> {
    core: HeapCore<C>,
    region: R,
}

impl<C, R> Heap<C, R>
    where
        C: Configuration,
        R: Region,
{
    /// Creates an instance, initializing the region.
    ///
    /// Fails if the region cannot be grown, or if it is not aligned on `C::ALIGNMENT`.
    ///
    /// #   Panics
    ///
    /// If `Properties::<C>::is_valid()` is false.
    pub fn new(mut region: R) -> Result<Self, AllocError> {
        let core = HeapCore::new(&mut region)?;

        Ok(Self { core, region })
    }

    /// Returns a reference to the region.
    pub fn region(&self) -> &R { &self.region }

    /// Returns the number of bytes obtained from the region so far.
    pub fn region_size(&self) -> usize { self.core.region_size() }

    /// Allocates `size` bytes of memory.
    pub fn allocate(&mut self, size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
        let block = self.core.allocate(&mut self.region, size)?;

        Ok(block.map(|block| self.core.payload_of(block)))
    }

    /// Allocates `count * size` bytes of memory, filled with 0.
    ///
    /// Fails with `AllocError::Overflow` if `count * size` overflows.
    pub fn zero_allocate(&mut self, count: usize, size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
        let bytes = count.checked_mul(size).ok_or(AllocError::Overflow)?;

        let block = match self.core.allocate(&mut self.region, bytes)? {
            Some(block) => block,
            None => return Ok(None),
        };

        self.core.zero_payload(block, bytes);

        Ok(Some(self.core.payload_of(block)))
    }

    /// Releases the memory pointed to by `pointer`, if any.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `resize` on this
    ///     instance.
    /// -   Assumes `pointer` has not been released since.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn release(&mut self, pointer: Option<NonNull<u8>>) {
        if let Some(pointer) = pointer {
            let block = self.core.block_of(pointer);
            self.core.release(block);
        }
    }

    /// Resizes the memory pointed to by `pointer`, if any, to `size` bytes.
    ///
    /// -   If `pointer` is None, this is equivalent to `allocate(size)`.
    /// -   If `size` is 0, this is equivalent to `release(pointer)`, and returns `Ok(None)`.
    /// -   Otherwise, the first `min(size, old size)` bytes of the memory are preserved, possibly at a new location.
    ///
    /// On failure, the memory pointed to by `pointer` is left untouched, and still allocated.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `resize` on this
    ///     instance.
    /// -   Assumes `pointer` has not been released since.
    /// -   Assumes the memory pointed by `pointer` is no longer in use, if a different pointer is returned.
    pub unsafe fn resize(&mut self, pointer: Option<NonNull<u8>>, size: usize)
        -> Result<Option<NonNull<u8>>, AllocError>
    {
        let pointer = match pointer {
            Some(pointer) => pointer,
            None => return self.allocate(size),
        };

        let block = self.core.block_of(pointer);
        let block = self.core.resize(&mut self.region, block, size)?;

        Ok(block.map(|block| self.core.payload_of(block)))
    }

    /// Returns the number of bytes usable at `pointer`, at least the size last requested.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `resize` on this
    ///     instance, and not released since.
    pub unsafe fn usable_size(&self, pointer: NonNull<u8>) -> usize {
        let block = self.core.block_of(pointer);

        Properties::<C>::payload_size(self.core.tag(block).size())
    }

    /// Returns an iterator over the blocks of the region, by increasing address.
    pub fn blocks(&self) -> Blocks<'_, C> { Blocks { core: &self.core, current: self.core.first() } }

    /// Walks the region, checking its consistency.
    ///
    /// When `verbose`, each block is logged at debug level, if the `log` feature is enabled.
    pub fn verify(&self, verbose: bool) -> Result<(), Corruption> { self.core.verify(verbose) }

    /// Walks the region, checking its consistency.
    ///
    /// #   Panics
    ///
    /// If any inconsistency is detected.
    pub fn check(&self, verbose: bool) {
        if let Err(corruption) = self.verify(verbose) {
            panic!("Heap corrupted: {}", corruption);
        }
    }
}

/// BlockInfo
///
/// A snapshot of the meta-data of a block.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BlockInfo {
    /// Offset of the block from the start of the region.
    pub offset: usize,
    /// Size of the block, meta-data included.
    pub size: usize,
    /// Whether the block is in use.
    pub is_used: bool,
    /// Whether the previous block is free.
    pub is_prev_free: bool,
}

/// Blocks
///
/// An iterator over the blocks of a Heap.
pub struct Blocks<'a, C> {
    core: &'a HeapCore<C>,
    current: Option<BlockOffset>,
}

impl<'a, C> Iterator for Blocks<'a, C>
    where
        C: Configuration
{
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let block = self.current?;

        self.current = self.core.next_block(block);

        Some(self.core.info(block))
    }
}
