use std::{alloc::{GlobalAlloc, Layout}, ptr::NonNull, slice};

use serial_test::serial;

use segalloc::{AllocError, SegAllocator};
use segalloc_test::{Replay, Rng, Trace, TraceAllocator};

#[test]
fn warm_up() {
    let allocator = SegAllocator::new();

    assert_eq!(0, allocator.reserved());

    allocator.warm_up().expect("Warmed up!");

    assert_eq!(1 << 30, allocator.reserved());
    assert_eq!(12, allocator.region_size());
}

#[test]
fn allocate_release_allocate() {
    let allocator = SegAllocator::new();

    let a = allocator.allocate(16).unwrap().unwrap();

    assert_eq!(0, a.as_ptr() as usize % 16);
    assert_eq!(12 + 32, allocator.region_size());

    unsafe { allocator.deallocate(a) };

    let b = allocator.allocate(16).unwrap().unwrap();

    assert_eq!(a, b);
    assert_eq!(12 + 32, allocator.region_size());

    allocator.check(true);
}

#[test]
fn allocate_zero() {
    let allocator = SegAllocator::new();

    assert_eq!(Ok(None), allocator.allocate(0));
}

#[test]
fn release_merges_neighbours() {
    let allocator = SegAllocator::new();

    let a = allocator.allocate(100).unwrap().unwrap();
    let b = allocator.allocate(8).unwrap().unwrap();

    unsafe {
        allocator.deallocate(a);
        allocator.deallocate(b);
    }

    //  A single free block of 112 + 16 bytes fits a request of 124 bytes without growth.
    let c = allocator.allocate(124).unwrap().unwrap();

    assert_eq!(a, c);
    assert_eq!(12 + 128, allocator.region_size());

    allocator.check(false);
}

#[test]
fn reallocate_last_in_place() {
    let allocator = SegAllocator::new();

    let a = allocator.allocate(24).unwrap().unwrap();
    unsafe { a.as_ptr().write_bytes(0x5a, 24) };

    let b = unsafe { allocator.reallocate(Some(a), 1_000) }.unwrap().unwrap();

    assert_eq!(a, b);
    assert_eq!(12 + 1_008, allocator.region_size());
    assert!(bytes(b, 24).iter().all(|&byte| byte == 0x5a));
    assert!(unsafe { allocator.usable_size(b) } >= 1_000);
}

#[test]
fn reallocate_moves() {
    let allocator = SegAllocator::new();

    let a = allocator.allocate(24).unwrap().unwrap();
    let _guard = allocator.allocate(24).unwrap().unwrap();

    for (index, byte) in bytes_mut(a, 24).iter_mut().enumerate() {
        *byte = index as u8;
    }

    let b = unsafe { allocator.reallocate(Some(a), 200) }.unwrap().unwrap();

    assert_ne!(a, b);
    assert!(bytes(b, 24).iter().enumerate().all(|(index, &byte)| byte == index as u8));

    allocator.check(false);
}

#[test]
fn reallocate_edge_cases() {
    let allocator = SegAllocator::new();

    let a = unsafe { allocator.reallocate(None, 40) }.unwrap();

    assert!(a.is_some());
    assert_eq!(Ok(None), unsafe { allocator.reallocate(a, 0) });

    allocator.check(false);
}

#[test]
fn zero_allocate() {
    let allocator = SegAllocator::new();

    let a = allocator.allocate(40).unwrap().unwrap();
    unsafe { a.as_ptr().write_bytes(0xff, 40) };
    let _guard = allocator.allocate(8).unwrap().unwrap();
    unsafe { allocator.deallocate(a) };

    let b = allocator.zero_allocate(10, 4).unwrap().unwrap();

    assert_eq!(a, b);
    assert!(bytes(b, 40).iter().all(|&byte| byte == 0));

    assert_eq!(Err(AllocError::Overflow), allocator.zero_allocate(usize::MAX, 2));
}

#[test]
fn out_of_memory() {
    let allocator = SegAllocator::new();

    assert_eq!(Err(AllocError::OutOfMemory), allocator.allocate(1 << 30));
    assert_eq!(Err(AllocError::OutOfMemory), allocator.allocate(usize::MAX - 3));

    allocator.check(false);
}

#[test]
fn global_alloc() {
    let allocator = SegAllocator::new();

    unsafe {
        let layout = Layout::from_size_align(48, 8).unwrap();

        let pointer = allocator.alloc_zeroed(layout);
        assert!(!pointer.is_null());
        assert!(slice::from_raw_parts(pointer, 48).iter().all(|&byte| byte == 0));

        pointer.write_bytes(0x11, 48);

        let pointer = allocator.realloc(pointer, layout, 480);
        assert!(!pointer.is_null());
        assert!(slice::from_raw_parts(pointer, 48).iter().all(|&byte| byte == 0x11));

        allocator.dealloc(pointer, Layout::from_size_align(480, 8).unwrap());

        //  Over-aligned requests are not supported.
        assert!(allocator.alloc(Layout::from_size_align(64, 64).unwrap()).is_null());
    }

    allocator.check(false);
}

#[serial]
#[test]
fn replay_random_traces() {
    for seed in 1..4 {
        let allocator = SegAllocator::new();

        let trace = Trace::random(&mut Rng::new(seed), 1_000, 8_192);

        let mut replay = Replay::new(Checked(&allocator), 16);
        let statistics = replay.run(&trace).expect("Replayed");

        assert_eq!(trace.ops().len(), statistics.operations);
        assert_eq!(0, statistics.live_payload);
    }
}

#[serial]
#[test]
fn replay_parsed_trace() {
    let text = "
        20000
        3
        9
        1
        a 0 2040
        a 1 2040
        f 1
        a 2 48
        r 0 4072
        c 1 10 4
        f 0
        f 2
        f 1
    ";

    let trace = Trace::parse(text).expect("Parsed");

    let allocator = SegAllocator::new();

    Replay::new(Checked(&allocator), 16).run(&trace).expect("Replayed");
}

//
//  Implementation Details
//

//  Checks the consistency of the heap after every operation.
struct Checked<'a>(&'a SegAllocator);

impl<'a> TraceAllocator for Checked<'a> {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> { self.0.allocate(size).ok().flatten() }

    fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        self.0.zero_allocate(count, size).ok().flatten()
    }

    unsafe fn release(&mut self, pointer: NonNull<u8>, _: usize) { self.0.deallocate(pointer) }

    unsafe fn resize(&mut self, pointer: NonNull<u8>, _: usize, new_size: usize) -> Option<NonNull<u8>> {
        self.0.reallocate(Some(pointer), new_size).ok().flatten()
    }

    fn check(&mut self) { self.0.check(false) }
}

fn bytes<'a>(pointer: NonNull<u8>, size: usize) -> &'a [u8] {
    unsafe { slice::from_raw_parts(pointer.as_ptr(), size) }
}

fn bytes_mut<'a>(pointer: NonNull<u8>, size: usize) -> &'a mut [u8] {
    unsafe { slice::from_raw_parts_mut(pointer.as_ptr(), size) }
}
