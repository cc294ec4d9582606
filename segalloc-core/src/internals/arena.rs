//! Arena
//!
//! The Arena is the only window onto the raw memory of the region: every read and write of meta-data, and every copy
//! or fill of a payload, goes through its bounds-checked accessors.
//!
//! All offsets are relative to the base of the region.

use core::{mem, ptr::{self, NonNull}};

/// Arena.
pub(crate) struct Arena {
    base: NonNull<u8>,
    len: usize,
}

//  Safety:
//  -   The memory is exclusively owned by the instance, as per `Arena::new`.
unsafe impl Send for Arena {}

impl Arena {
    /// Creates an instance over `len` bytes starting at `base`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `[base, base + len)` is readable and writable, and exclusively owned by the instance.
    /// -   Assumes that `base` is suitably aligned for a `u32`.
    pub(crate) unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        debug_assert!(base.as_ptr() as usize % mem::align_of::<u32>() == 0);

        Self { base, len }
    }

    /// Returns the number of bytes in the arena, that is the offset of its high end.
    pub(crate) fn len(&self) -> usize { self.len }

    /// Extends the arena by `delta` bytes starting at `extension`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `extension` is the current high end of the arena.
    /// -   Assumes that `[extension, extension + delta)` is readable and writable, and exclusively owned.
    pub(crate) unsafe fn extend(&mut self, extension: NonNull<u8>, delta: usize) {
        debug_assert_eq!(self.pointer(self.len), extension, "Region grew non-contiguously");

        self.len += delta;
    }

    /// Reads the 32-bits word at `offset`.
    ///
    /// #   Panics
    ///
    /// If the word is not within the arena, or is misaligned.
    pub(crate) fn read_word(&self, offset: usize) -> u32 {
        let at = self.word_pointer(offset);

        //  Safety:
        //  -   `at` is within the arena, and aligned.
        unsafe { ptr::read(at) }
    }

    /// Writes the 32-bits word at `offset`.
    ///
    /// #   Panics
    ///
    /// If the word is not within the arena, or is misaligned.
    pub(crate) fn write_word(&mut self, offset: usize, value: u32) {
        let at = self.word_pointer(offset);

        //  Safety:
        //  -   `at` is within the arena, and aligned.
        //  -   The arena is exclusively borrowed.
        unsafe { ptr::write(at, value) }
    }

    /// Copies `count` bytes from `from` to `to`; the ranges may overlap.
    ///
    /// #   Panics
    ///
    /// If either range is not within the arena.
    pub(crate) fn copy(&mut self, from: usize, to: usize, count: usize) {
        self.check_range(from, count);
        self.check_range(to, count);

        //  Safety:
        //  -   Both ranges are within the arena.
        //  -   The arena is exclusively borrowed.
        unsafe { ptr::copy(self.raw(from), self.raw(to), count) }
    }

    /// Fills `count` bytes at `offset` with 0.
    ///
    /// #   Panics
    ///
    /// If the range is not within the arena.
    pub(crate) fn zero(&mut self, offset: usize, count: usize) {
        self.check_range(offset, count);

        //  Safety:
        //  -   The range is within the arena.
        //  -   The arena is exclusively borrowed.
        unsafe { ptr::write_bytes(self.raw(offset), 0, count) }
    }

    /// Returns the pointer to `offset`.
    ///
    /// #   Panics
    ///
    /// If `offset` is beyond the high end of the arena.
    pub(crate) fn pointer(&self, offset: usize) -> NonNull<u8> {
        assert!(offset <= self.len, "Offset {:#x} out of arena of {:#x} bytes", offset, self.len);

        //  Safety:
        //  -   `offset` is within the arena, or one past its end, hence the result is not null.
        unsafe { NonNull::new_unchecked(self.raw(offset)) }
    }

    /// Returns the offset of `pointer`.
    ///
    /// #   Panics
    ///
    /// If `pointer` does not point within the arena.
    pub(crate) fn offset_of(&self, pointer: NonNull<u8>) -> usize {
        let (base, pointer) = (self.base.as_ptr() as usize, pointer.as_ptr() as usize);

        assert!(pointer >= base && pointer - base < self.len,
            "Pointer {:#x} out of arena [{:#x}, {:#x})", pointer, base, base + self.len);

        pointer - base
    }

    fn word_pointer(&self, offset: usize) -> *mut u32 {
        const WORD: usize = mem::size_of::<u32>();

        self.check_range(offset, WORD);
        assert!(offset % WORD == 0, "Misaligned word at {:#x}", offset);

        self.raw(offset) as *mut u32
    }

    fn check_range(&self, offset: usize, count: usize) {
        assert!(offset <= self.len && count <= self.len - offset,
            "Range [{:#x}, +{:#x}) out of arena of {:#x} bytes", offset, count, self.len);
    }

    //  Internal; computes the pointer without bounds-check.
    fn raw(&self, offset: usize) -> *mut u8 { self.base.as_ptr().wrapping_add(offset) }
}
