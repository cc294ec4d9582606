//! Region
//!
//! The Region trait is the only source of memory of a Heap. By abstracting the underlying provider, it becomes
//! possible to back a Heap by `mmap`, by `sbrk`, by a static array, or even by a bare-metal memory range.

use core::ptr::NonNull;

/// Abstraction of a contiguous memory region, growing at its high end.
pub trait Region {
    /// Grows the region by exactly `delta` bytes, returning a pointer to the start of the extension.
    ///
    /// Returns None if the region cannot be grown, in which case the region is left unchanged.
    ///
    /// #   Safety
    ///
    /// The caller may assume that if the returned pointer is not null then:
    /// -   The `delta` bytes starting at the pointer are readable, writable, and not in use by anyone else.
    /// -   The pointer is equal to the pointer returned by the first call, plus the sum of all previous `delta`.
    ///
    /// `grow` assumes that:
    /// -   `delta` is non-zero.
    unsafe fn grow(&mut self, delta: usize) -> Option<NonNull<u8>>;
}
