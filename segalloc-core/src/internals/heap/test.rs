//! Test helpers for the heap.

use core::{
    ops,
    ptr::NonNull,
};

use crate::{AllocError, Configuration, PowerOf2, Region};
use super::{BlockOffset, HeapCore};

/// Offset of the first block.
pub(crate) const PREFIX: usize = 12;

/// Test configuration
pub(crate) struct TestConfiguration;

impl Configuration for TestConfiguration {
    const ALIGNMENT: PowerOf2 = unsafe { PowerOf2::new_unchecked(16) };
    const MAX_REGION_SIZE: usize = 1 << 20;
}

/// Test Region
///
/// A region of bounded capacity, backed by a 16-bytes aligned vector.
pub(crate) struct TestRegion {
    store: Vec<RegionCell>,
    used: usize,
    capacity: usize,
    failing: bool,
}

impl TestRegion {
    /// Creates a region of up to `capacity` bytes.
    pub(crate) fn new(capacity: usize) -> Self {
        let mut store = vec!();
        store.resize(capacity / 16 + 1, RegionCell::default());

        Self { store, used: 0, capacity, failing: false }
    }

    /// Makes every subsequent growth fail, or succeed again.
    pub(crate) fn set_failing(&mut self, failing: bool) { self.failing = failing; }

    /// Returns the number of bytes handed out.
    pub(crate) fn used(&self) -> usize { self.used }
}

impl Region for TestRegion {
    unsafe fn grow(&mut self, delta: usize) -> Option<NonNull<u8>> {
        assert!(delta > 0);

        if self.failing || delta > self.capacity - self.used {
            return None;
        }

        let result = (self.store.as_mut_ptr() as *mut u8).add(self.used);
        self.used += delta;

        NonNull::new(result)
    }
}

/// Test Heap
///
/// A HeapCore bundled with its TestRegion, and operating on BlockOffset.
pub(crate) struct TestHeap {
    pub(crate) core: HeapCore<TestConfiguration>,
    region: TestRegion,
}

impl TestHeap {
    /// Creates a heap over a region of up to `capacity` bytes.
    pub(crate) fn new(capacity: usize) -> Self {
        let mut region = TestRegion::new(capacity);
        let core = HeapCore::new(&mut region).expect("Initialized");

        Self { core, region }
    }

    pub(crate) fn region(&mut self) -> &mut TestRegion { &mut self.region }

    pub(crate) fn allocate(&mut self, size: usize) -> Result<Option<BlockOffset>, AllocError> {
        self.core.allocate(&mut self.region, size)
    }

    pub(crate) fn release(&mut self, block: BlockOffset) { self.core.release(block) }

    pub(crate) fn resize(&mut self, block: BlockOffset, size: usize) -> Result<Option<BlockOffset>, AllocError> {
        self.core.resize(&mut self.region, block, size)
    }

    /// Fills the payload of `block` with `byte`, over `size` bytes.
    pub(crate) fn fill(&mut self, block: BlockOffset, size: usize, byte: u8) {
        let payload = self.core.payload_of(block);

        //  Safety:
        //  -   The caller requested at least `size` bytes for `block`.
        unsafe { core::ptr::write_bytes(payload.as_ptr(), byte, size) };
    }

    /// Returns a copy of the first `size` bytes of the payload of `block`.
    pub(crate) fn read(&self, block: BlockOffset, size: usize) -> Vec<u8> {
        let payload = self.core.payload_of(block);

        //  Safety:
        //  -   The caller requested at least `size` bytes for `block`.
        unsafe { core::slice::from_raw_parts(payload.as_ptr(), size) }.to_vec()
    }

    /// Verifies the heap, panicking on corruption.
    pub(crate) fn verify(&self) {
        if let Err(corruption) = self.core.verify(false) {
            panic!("Corrupted heap: {}", corruption);
        }
    }
}

impl ops::Deref for TestHeap {
    type Target = HeapCore<TestConfiguration>;

    fn deref(&self) -> &Self::Target { &self.core }
}

#[repr(align(16))]
#[derive(Clone, Default)]
struct RegionCell([u8; 16]);
