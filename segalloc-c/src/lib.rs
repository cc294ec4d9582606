#![no_std]
#![deny(missing_docs)]

//! Exposition of SegAllocator API via a C ABI.
//!
//! The functions follow the conventions of their C standard library counterparts: a NULL pointer is returned on
//! failure, or when no memory is requested.

use core::ptr::{self, NonNull};

use segalloc::{AllocError, SegAllocator};

/// Initializes the heap.
///
/// Returns 0 on success, and a negative value otherwise.
///
/// Calling this function is optional, the heap being lazily initialized on first use otherwise.
#[cold]
#[no_mangle]
pub extern fn sm_init() -> i32 { if ALLOCATOR.warm_up().is_ok() { 0 } else { -1 } }

/// Allocates `size` bytes of memory, aligned on 16 bytes.
///
/// Returns NULL if the allocation fails, or if `size` is 0.
#[no_mangle]
pub extern fn sm_malloc(size: usize) -> *mut u8 { into_raw(ALLOCATOR.allocate(size)) }

/// Allocates `count * size` bytes of memory, filled with 0, aligned on 16 bytes.
///
/// Returns NULL if the allocation fails, if `count * size` overflows, or if it is 0.
#[no_mangle]
pub extern fn sm_calloc(count: usize, size: usize) -> *mut u8 { into_raw(ALLOCATOR.zero_allocate(count, size)) }

/// Reallocates the memory located at `pointer` to `size` bytes.
///
/// -   If `pointer` is NULL, this is equivalent to `sm_malloc(size)`.
/// -   If `size` is 0, the memory is deallocated, and NULL is returned.
/// -   If the reallocation fails, NULL is returned and the memory located at `pointer` is left untouched.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `sm_malloc`, `sm_calloc`, or `sm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
#[no_mangle]
pub unsafe extern fn sm_realloc(pointer: *mut u8, size: usize) -> *mut u8 {
    into_raw(ALLOCATOR.reallocate(NonNull::new(pointer), size))
}

/// Deallocates the memory located at `pointer`.
///
/// Does nothing if `pointer` is NULL.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `sm_malloc`, `sm_calloc`, or `sm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern fn sm_free(pointer: *mut u8) {
    if let Some(pointer) = NonNull::new(pointer) {
        ALLOCATOR.deallocate(pointer);
    }
}

/// Returns the number of bytes usable at `pointer`, or 0 if `pointer` is NULL.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `sm_malloc`, `sm_calloc`, or `sm_realloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
#[no_mangle]
pub unsafe extern fn sm_usable_size(pointer: *mut u8) -> usize {
    NonNull::new(pointer).map(|pointer| ALLOCATOR.usable_size(pointer)).unwrap_or(0)
}

/// Checks the consistency of the heap, aborting the process on inconsistency.
///
/// If `verbose` is non-zero, each block is logged, if logging is enabled.
#[cold]
#[no_mangle]
pub extern fn sm_checkheap(verbose: i32) { ALLOCATOR.check(verbose != 0) }

//
//  Implementation
//

static ALLOCATOR: SegAllocator = SegAllocator::new();

fn into_raw(result: Result<Option<NonNull<u8>>, AllocError>) -> *mut u8 {
    result.ok().flatten().map(|pointer| pointer.as_ptr()).unwrap_or(ptr::null_mut())
}
