//! Allocator

use core::{
    alloc::{GlobalAlloc, Layout},
    ptr::{self, NonNull},
};

use segalloc_core::{AllocError, Heap};

use spin::Mutex;

use crate::{Configuration, Platform, SegConfiguration, MmapRegion};

/// Segregated-fit Allocator.
///
/// All operations are serialized by a single lock, around a single heap, which is lazily initialized on first use.
#[derive(Default)]
pub struct SegAllocator {
    heap: Mutex<Option<SegHeap>>,
}

impl SegAllocator {
    /// Creates an instance.
    pub const fn new() -> Self { Self { heap: Mutex::new(None) } }

    /// Initializes the heap, if not already done.
    ///
    /// Returns Ok if the heap is ready, Err otherwise.
    ///
    /// Failure to warm up may occur if the address space for the region cannot be reserved.
    #[cold]
    pub fn warm_up(&self) -> Result<(), AllocError> { self.with_heap(|_| Ok(())) }

    /// Allocates `size` bytes of memory, aligned on at least `ALIGNMENT`.
    ///
    /// Returns `Ok(None)` if `size` is 0.
    pub fn allocate(&self, size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
        self.with_heap(|heap| heap.allocate(size))
    }

    /// Allocates `count * size` bytes of memory, filled with 0, aligned on at least `ALIGNMENT`.
    ///
    /// Returns `Ok(None)` if `count * size` is 0, and `Err(AllocError::Overflow)` if it overflows.
    pub fn zero_allocate(&self, count: usize, size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
        self.with_heap(|heap| heap.zero_allocate(count, size))
    }

    /// Deallocates the memory located at `pointer`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn deallocate(&self, pointer: NonNull<u8>) {
        let mut heap = self.heap.lock();

        //  If a non-null pointer exists, it _must_ have been allocated, and therefore the heap must exist.
        debug_assert!(heap.is_some(), "Deallocation of {:?} prior to any allocation", pointer);

        if let Some(heap) = heap.as_mut() {
            heap.release(Some(pointer));
        }
    }

    /// Reallocates the memory located at `pointer`, if any, to `size` bytes.
    ///
    /// Follows the semantics of `Heap::resize`:
    ///
    /// -   If `pointer` is None, this is equivalent to `allocate(size)`.
    /// -   If `size` is 0, the memory is deallocated, and `Ok(None)` is returned.
    /// -   On failure, the memory located at `pointer` is left untouched.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    pub unsafe fn reallocate(&self, pointer: Option<NonNull<u8>>, size: usize)
        -> Result<Option<NonNull<u8>>, AllocError>
    {
        self.with_heap(|heap| heap.resize(pointer, size))
    }

    /// Returns the number of bytes usable at `pointer`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate`, `zero_allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    pub unsafe fn usable_size(&self, pointer: NonNull<u8>) -> usize {
        self.heap.lock().as_ref().map(|heap| heap.usable_size(pointer)).unwrap_or(0)
    }

    /// Checks the consistency of the heap, if initialized.
    ///
    /// When `verbose`, each block is logged at debug level, if the `log` feature is enabled.
    ///
    /// #   Panics
    ///
    /// If any inconsistency is detected.
    #[cold]
    pub fn check(&self, verbose: bool) {
        if let Some(heap) = self.heap.lock().as_ref() {
            heap.check(verbose);
        }
    }

    //  Runs `fun` on the heap, initializing it first if necessary.
    fn with_heap<F, T>(&self, fun: F) -> Result<T, AllocError>
        where
            F: FnOnce(&mut SegHeap) -> Result<T, AllocError>,
    {
        let mut guard = self.heap.lock();

        if guard.is_none() {
            *guard = Some(Self::initialize()?);
        }

        match guard.as_mut() {
            Some(heap) => fun(heap),
            None => Err(AllocError::OutOfMemory),
        }
    }

    #[cold]
    #[inline(never)]
    fn initialize() -> Result<SegHeap, AllocError> { SegHeap::new(MmapRegion::new()) }
}

unsafe impl GlobalAlloc for SegAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > SegConfiguration::ALIGNMENT.value() {
            return ptr::null_mut();
        }

        into_raw(self.allocate(layout.size()))
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.deallocate(ptr);
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > SegConfiguration::ALIGNMENT.value() {
            return ptr::null_mut();
        }

        into_raw(self.zero_allocate(1, layout.size()))
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > SegConfiguration::ALIGNMENT.value() {
            return ptr::null_mut();
        }

        into_raw(self.reallocate(NonNull::new(ptr), new_size))
    }
}

//
//  Integration test backdoors.
//
//  Unfortunately the backdoors have to be exposed as part of the public API for use in integration tests.
//

impl SegAllocator {
    /// Exposes the number of bytes of the region handed out to the heap.
    #[cold]
    #[doc(hidden)]
    pub fn region_size(&self) -> usize {
        self.heap.lock().as_ref().map(|heap| heap.region().used()).unwrap_or(0)
    }

    /// Exposes the number of bytes of address space reserved for the region.
    #[cold]
    #[doc(hidden)]
    pub fn reserved(&self) -> usize {
        self.heap.lock().as_ref().map(|heap| heap.region().reserved()).unwrap_or(0)
    }
}

//
//  Implementation
//

type SegHeap = Heap<SegConfiguration, MmapRegion>;

fn into_raw(result: Result<Option<NonNull<u8>>, AllocError>) -> *mut u8 {
    result.ok().flatten().map(|pointer| pointer.as_ptr()).unwrap_or(ptr::null_mut())
}
