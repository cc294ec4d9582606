//! Implementation of Linux specific calls.

use core::ptr::{self, NonNull};

use segalloc_core::PowerOf2;

use super::{Configuration, Platform, Region};

/// Implementation of the Configuration trait, for Linux.
#[derive(Default)]
pub(crate) struct SegConfiguration;

impl Configuration for SegConfiguration {
    //  16 bytes
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(16) };

    //  1 GB
    const MAX_REGION_SIZE: usize = 1024 * 1024 * 1024;
}

/// Implementation of the Region trait, for Linux.
///
/// The whole `MAX_REGION_SIZE` of address space is reserved, but not committed, on first growth. Growing then merely
/// moves the break forward, the OS committing the pages as they are touched.
pub(crate) struct MmapRegion {
    base: Option<NonNull<u8>>,
    brk: usize,
}

impl MmapRegion {
    const RESERVATION: usize = SegConfiguration::MAX_REGION_SIZE;

    /// Creates an instance, without reserving anything yet.
    pub(crate) const fn new() -> Self { Self { base: None, brk: 0 } }

    #[cold]
    #[inline(never)]
    fn reserve(&mut self) -> Option<NonNull<u8>> {
        let base = mmap_reserve(Self::RESERVATION)?;

        debug_assert!(base.as_ptr() as usize % SegConfiguration::ALIGNMENT == 0,
            "Incorrect alignment of reservation: {:x}", base.as_ptr() as usize);

        self.base = Some(base);
        Some(base)
    }
}

impl Default for MmapRegion {
    fn default() -> Self { Self::new() }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        if let Some(base) = self.base.take() {
            //  Safety:
            //  -   `base` points to a `mmap`ed area of `RESERVATION` bytes.
            //  -   The area is no longer in use, as the instance is being dropped.
            unsafe { munmap_deallocate(base.as_ptr(), Self::RESERVATION) };
        }
    }
}

impl Region for MmapRegion {
    unsafe fn grow(&mut self, delta: usize) -> Option<NonNull<u8>> {
        let base = match self.base {
            Some(base) => base,
            None => self.reserve()?,
        };

        if delta > Self::RESERVATION - self.brk {
            return None;
        }

        //  Safety:
        //  -   `self.brk + delta` is within the reservation, hence so is `self.brk`.
        let result = base.as_ptr().add(self.brk);
        self.brk += delta;

        NonNull::new(result)
    }
}

impl Platform for MmapRegion {
    fn reserved(&self) -> usize { if self.base.is_some() { Self::RESERVATION } else { 0 } }

    fn used(&self) -> usize { self.brk }
}

//  Safety:
//  -   The reservation is exclusively owned by the instance.
unsafe impl Send for MmapRegion {}

//  Wrapper around `mmap`, reserving address space without committing memory.
//
//  Returns a page-aligned pointer to `size` bytes of memory.
fn mmap_reserve(size: usize) -> Option<NonNull<u8>> {
    let length = size;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;

    //  No specific address hint.
    let addr = ptr::null_mut();
    //  When used in conjunction with MAP_ANONYMOUS, fd is mandated to be -1 on some implementations.
    let fd = -1;
    //  When used in conjunction with MAP_ANONYMOUS, offset is mandated to be 0 on some implementations.
    let offset = 0;

    //  Safety:
    //  -   `addr`, `fd`, and `offset` are suitable for MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(addr, length, prot, flags, fd, offset) };

    let result = if result != libc::MAP_FAILED { result as *mut u8 } else { ptr::null_mut() };
    NonNull::new(result)
}

//  Wrapper around `munmap`.
//
//  #   Panics
//
//  If `munmap` returns a non-0 result.
//
//  #   Safety
//
//  -   Assumes that `addr` points to a `mmap`ed area of at least `size` bytes.
//  -   Assumes that the range `[addr, addr + size)` is no longer in use.
unsafe fn munmap_deallocate(addr: *mut u8, size: usize) {
    let result = libc::munmap(addr as *mut libc::c_void, size);
    assert!(result == 0, "Could not munmap {:x}, {}: {}", addr as usize, size, result);
}
