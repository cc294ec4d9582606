//! A trace runner, for checking allocators against sequences of operations.

use std::{collections::BTreeMap, fmt, ptr::NonNull, slice};

use crate::Rng;

/// The allocator under test.
///
/// Failures, of any kind, are reported as None.
pub trait TraceAllocator {
    /// Allocates `size` bytes.
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>>;

    /// Allocates `count * size` bytes, filled with 0.
    fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>>;

    /// Releases `pointer`, of `size` bytes.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was returned by this allocator, for `size` bytes, and not released since.
    unsafe fn release(&mut self, pointer: NonNull<u8>, size: usize);

    /// Resizes `pointer`, of `old_size` bytes, to `new_size` bytes.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` was returned by this allocator, for `old_size` bytes, and not released since.
    unsafe fn resize(&mut self, pointer: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>>;

    /// Invoked after each operation, for example to check the consistency of the allocator.
    fn check(&mut self) {}
}

/// A single operation of a trace.
///
/// Each allocation is identified by a small integer, its id, so that it may be referred to by later operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Op {
    /// Allocates `size` bytes, under `id`.
    Allocate {
        /// Identifier.
        id: usize,
        /// Size, in bytes.
        size: usize,
    },
    /// Allocates `count * size` zeroed bytes, under `id`.
    ZeroAllocate {
        /// Identifier.
        id: usize,
        /// Number of elements.
        count: usize,
        /// Size of each element, in bytes.
        size: usize,
    },
    /// Resizes the allocation `id` to `size` bytes.
    Resize {
        /// Identifier.
        id: usize,
        /// Size, in bytes.
        size: usize,
    },
    /// Releases the allocation `id`.
    Release {
        /// Identifier.
        id: usize,
    },
}

impl Op {
    /// Returns the id the operation applies to.
    pub fn id(&self) -> usize {
        match *self {
            Op::Allocate { id, .. } | Op::ZeroAllocate { id, .. } | Op::Resize { id, .. } | Op::Release { id } => id,
        }
    }
}

/// A sequence of operations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Trace {
    ops: Vec<Op>,
    number_ids: usize,
}

impl Trace {
    /// Creates an instance.
    pub fn new(ops: Vec<Op>) -> Self {
        let number_ids = ops.iter().map(|op| op.id() + 1).max().unwrap_or(0);

        Self { ops, number_ids }
    }

    /// Returns the operations.
    pub fn ops(&self) -> &[Op] { &self.ops }

    /// Returns the number of distinct ids, that is the highest id plus 1.
    pub fn number_ids(&self) -> usize { self.number_ids }

    /// Generates a random trace of about `number_ops` operations, with sizes up to `max_size`.
    ///
    /// Most requests are small, a few are large. All allocations are released by the end of the trace.
    ///
    /// #   Panics
    ///
    /// If `max_size` is 0.
    pub fn random(rng: &mut Rng, number_ops: usize, max_size: usize) -> Self {
        assert!(max_size > 0);

        let mut live = Vec::new();
        let mut ops = Vec::with_capacity(number_ops);
        let mut next_id = 0;

        for _ in 0..number_ops {
            if live.is_empty() || rng.chance(50) {
                let id = next_id;
                next_id += 1;

                let size = Self::random_size(rng, max_size);

                if rng.chance(10) {
                    let count = rng.between(1, 8);
                    ops.push(Op::ZeroAllocate { id, count, size: (size / count).max(1) });
                } else {
                    ops.push(Op::Allocate { id, size });
                }

                live.push(id);
                continue;
            }

            let index = rng.below(live.len());

            if rng.chance(65) {
                let id = live.swap_remove(index);
                ops.push(Op::Release { id });
            } else {
                ops.push(Op::Resize { id: live[index], size: Self::random_size(rng, max_size) });
            }
        }

        ops.extend(live.into_iter().map(|id| Op::Release { id }));

        Self { ops, number_ids: next_id }
    }

    /// Parses a trace, in the classic malloc-lab format.
    ///
    /// The format is a header of 4 numbers, one per line: suggested heap size, number of ids, number of operations,
    /// and weight. It is followed by one operation per line:
    ///
    /// -   `a <id> <size>`: allocate.
    /// -   `c <id> <count> <size>`: zero allocate.
    /// -   `r <id> <size>`: resize.
    /// -   `f <id>`: release.
    ///
    /// #   Example
    ///
    /// ```
    /// use segalloc_test::{Op, Trace};
    ///
    /// let trace = Trace::parse("0\n1\n2\n1\na 0 16\nf 0\n").unwrap();
    ///
    /// assert_eq!(&[Op::Allocate { id: 0, size: 16 }, Op::Release { id: 0 }][..], trace.ops());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let mut header = [0usize; 4];

        for slot in &mut header {
            let (number, line) = lines.next().ok_or(ParseError { line: 0, reason: "truncated header" })?;
            *slot = line.parse().map_err(|_| ParseError { line: number, reason: "invalid header" })?;
        }

        let [_, number_ids, number_ops, _] = header;

        let mut ops = Vec::with_capacity(number_ops);

        for (number, line) in lines {
            let op = Self::parse_op(line).map_err(|reason| ParseError { line: number, reason })?;

            if op.id() >= number_ids {
                return Err(ParseError { line: number, reason: "id out of range" });
            }

            ops.push(op);
        }

        if ops.len() != number_ops {
            return Err(ParseError { line: 0, reason: "mismatched number of operations" });
        }

        Ok(Self { ops, number_ids })
    }

    fn parse_op(line: &str) -> Result<Op, &'static str> {
        let mut fields = line.split_whitespace();

        let kind = fields.next().ok_or("missing operation")?;

        let mut number = || -> Result<usize, &'static str> {
            fields.next().ok_or("missing field")?.parse().map_err(|_| "invalid number")
        };

        let op = match kind {
            "a" => Op::Allocate { id: number()?, size: number()? },
            "c" => Op::ZeroAllocate { id: number()?, count: number()?, size: number()? },
            "r" => Op::Resize { id: number()?, size: number()? },
            "f" => Op::Release { id: number()? },
            _ => return Err("unknown operation"),
        };

        match fields.next() {
            None => Ok(op),
            Some(_) => Err("trailing field"),
        }
    }

    fn random_size(rng: &mut Rng, max_size: usize) -> usize {
        if rng.chance(80) { rng.between(1, max_size.min(64)) } else { rng.between(1, max_size) }
    }
}

/// Error of `Trace::parse`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseError {
    /// Line number, starting at 1, or 0 if not attributable to a line.
    pub line: usize,
    /// Reason.
    pub reason: &'static str,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// A failure detected during the replay of a trace.
///
/// The `index` is that of the operation, within the trace, which exposed the failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// The allocator failed to satisfy the request.
    OutOfMemory {
        /// Index of the operation.
        index: usize,
    },
    /// The allocator returned a pointer not aligned on the expected boundary.
    Misaligned {
        /// Index of the operation.
        index: usize,
        /// Returned address.
        address: usize,
    },
    /// The allocator returned memory overlapping another live allocation.
    Overlap {
        /// Index of the operation.
        index: usize,
        /// Id of the new allocation.
        id: usize,
        /// Id of the live allocation it overlaps with.
        other: usize,
    },
    /// The content of an allocation was not preserved.
    Corrupted {
        /// Index of the operation.
        index: usize,
        /// Id of the allocation.
        id: usize,
    },
    /// The memory returned by a zero allocation was not zeroed.
    NotZeroed {
        /// Index of the operation.
        index: usize,
        /// Id of the allocation.
        id: usize,
    },
    /// The operation refers to an id in the wrong state: allocating a live id, or releasing a vacant one.
    InvalidId {
        /// Index of the operation.
        index: usize,
        /// Id of the allocation.
        id: usize,
    },
}

/// Statistics gathered during a replay.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    /// Number of operations executed.
    pub operations: usize,
    /// Number of bytes currently allocated, as requested.
    pub live_payload: usize,
    /// Maximum of `live_payload` over the replay.
    pub peak_payload: usize,
}

/// Replay, executes traces against a `TraceAllocator`.
///
/// Every byte of every live allocation is filled with a pattern derived from its id, and the pattern is checked
/// before the allocation is resized or released.
///
/// #   Example
///
/// Replaying a trace against the system allocator.
///
/// ```
/// use std::{alloc::{GlobalAlloc, Layout, System}, ptr::NonNull};
/// use segalloc_test::{Replay, Rng, Trace, TraceAllocator};
///
/// struct Sys;
///
/// fn layout(size: usize) -> Layout { Layout::from_size_align(size.max(1), 16).unwrap() }
///
/// impl TraceAllocator for Sys {
///     fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
///         NonNull::new(unsafe { System.alloc(layout(size)) })
///     }
///
///     fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
///         NonNull::new(unsafe { System.alloc_zeroed(layout(count * size)) })
///     }
///
///     unsafe fn release(&mut self, pointer: NonNull<u8>, size: usize) {
///         System.dealloc(pointer.as_ptr(), layout(size))
///     }
///
///     unsafe fn resize(&mut self, pointer: NonNull<u8>, old: usize, new: usize) -> Option<NonNull<u8>> {
///         NonNull::new(System.realloc(pointer.as_ptr(), layout(old), new.max(1)))
///     }
/// }
///
/// let trace = Trace::random(&mut Rng::new(42), 1_000, 4_096);
///
/// let mut replay = Replay::new(Sys, 16);
/// let statistics = replay.run(&trace).unwrap();
///
/// assert_eq!(trace.ops().len(), statistics.operations);
/// assert_eq!(0, statistics.live_payload);
/// ```
pub struct Replay<A> {
    allocator: A,
    alignment: usize,
    slots: Vec<Slot>,
    by_address: BTreeMap<usize, (usize, usize)>,
    statistics: Statistics,
}

impl<A> Replay<A>
    where
        A: TraceAllocator,
{
    /// Creates an instance, checking that all pointers are aligned on `alignment`.
    ///
    /// #   Panics
    ///
    /// If `alignment` is not a power of 2.
    pub fn new(allocator: A, alignment: usize) -> Self {
        assert!(alignment.is_power_of_two(), "{} is not a power of 2", alignment);

        Self { allocator, alignment, slots: Vec::new(), by_address: BTreeMap::new(), statistics: Statistics::default() }
    }

    /// Returns a reference to the allocator.
    pub fn allocator(&self) -> &A { &self.allocator }

    /// Returns a mutable reference to the allocator.
    pub fn allocator_mut(&mut self) -> &mut A { &mut self.allocator }

    /// Returns the statistics so far.
    pub fn statistics(&self) -> Statistics { self.statistics }

    /// Runs `trace`, stopping at the first failure.
    ///
    /// Allocations still live at the end of the trace are kept, and may be used by a subsequent trace.
    pub fn run(&mut self, trace: &Trace) -> Result<Statistics, Failure> {
        if self.slots.len() < trace.number_ids() {
            self.slots.resize_with(trace.number_ids(), || Slot::Vacant);
        }

        for (index, op) in trace.ops().iter().enumerate() {
            self.execute(index, *op)?;

            self.statistics.operations += 1;
            self.allocator.check();
        }

        Ok(self.statistics)
    }

    /// Releases all allocations still live, checking their content.
    pub fn release_all(&mut self) -> Result<(), Failure> {
        for id in 0..self.slots.len() {
            if let Slot::Vacant = self.slots[id] {
                continue;
            }

            self.release(usize::MAX, id)?;
        }

        Ok(())
    }

    /// Consumes the instance, returning the allocator.
    ///
    /// Live allocations are leaked.
    pub fn into_inner(self) -> A { self.allocator }

    fn execute(&mut self, index: usize, op: Op) -> Result<(), Failure> {
        match op {
            Op::Allocate { id, size } => {
                self.vacant(index, id)?;

                let pointer = self.allocator.allocate(size);
                self.admit(index, id, pointer, size)
            },
            Op::ZeroAllocate { id, count, size } => {
                self.vacant(index, id)?;

                let bytes = count.saturating_mul(size);
                let pointer = self.allocator.zero_allocate(count, size);

                if let Some(pointer) = pointer {
                    //  Safety:
                    //  -   `pointer` was just allocated for `bytes`.
                    if unsafe { bytes_of(pointer, bytes) }.iter().any(|&byte| byte != 0) {
                        return Err(Failure::NotZeroed { index, id });
                    }
                }

                self.admit(index, id, pointer, bytes)
            },
            Op::Resize { id, size } => self.resize(index, id, size),
            Op::Release { id } => self.release(index, id),
        }
    }

    fn resize(&mut self, index: usize, id: usize, size: usize) -> Result<(), Failure> {
        let live = match self.slot(index, id)? {
            Slot::Vacant => return Err(Failure::InvalidId { index, id }),
            Slot::Empty => {
                let pointer = self.allocator.allocate(size);
                return self.admit(index, id, pointer, size);
            },
            Slot::Live(live) => live,
        };

        self.verify(index, id, live, live.size)?;

        //  Safety:
        //  -   `live.pointer` was allocated by `self.allocator` for `live.size`, and not released since.
        let pointer = unsafe { self.allocator.resize(live.pointer, live.size, size) };

        if pointer.is_none() && size > 0 {
            return Err(Failure::OutOfMemory { index });
        }

        self.evict(id, live);

        if let Some(pointer) = pointer {
            let preserved = Live { pointer, size: live.size.min(size) };
            self.verify(index, id, preserved, preserved.size)?;
        }

        self.admit(index, id, pointer, size)
    }

    fn release(&mut self, index: usize, id: usize) -> Result<(), Failure> {
        let live = match self.slot(index, id)? {
            Slot::Vacant => return Err(Failure::InvalidId { index, id }),
            Slot::Empty => {
                self.slots[id] = Slot::Vacant;
                return Ok(());
            },
            Slot::Live(live) => live,
        };

        self.verify(index, id, live, live.size)?;
        self.evict(id, live);
        self.slots[id] = Slot::Vacant;

        //  Safety:
        //  -   `live.pointer` was allocated by `self.allocator` for `live.size`, and not released since.
        unsafe { self.allocator.release(live.pointer, live.size) };

        Ok(())
    }

    //  Records a new allocation, after checking it, and fills it with its pattern.
    fn admit(&mut self, index: usize, id: usize, pointer: Option<NonNull<u8>>, size: usize) -> Result<(), Failure> {
        let pointer = match pointer {
            Some(pointer) => pointer,
            None if size == 0 => {
                self.slots[id] = Slot::Empty;
                return Ok(());
            },
            None => return Err(Failure::OutOfMemory { index }),
        };

        let address = pointer.as_ptr() as usize;

        if address % self.alignment != 0 {
            return Err(Failure::Misaligned { index, address });
        }

        if size > 0 {
            let end = address + size;

            if let Some((_, &(other_end, other))) = self.by_address.range(..end).next_back() {
                if other_end > address {
                    return Err(Failure::Overlap { index, id, other });
                }
            }

            self.by_address.insert(address, (end, id));
        }

        //  Safety:
        //  -   `pointer` was just allocated for `size` bytes.
        for (offset, byte) in unsafe { bytes_of_mut(pointer, size) }.iter_mut().enumerate() {
            *byte = pattern(id, offset);
        }

        self.slots[id] = Slot::Live(Live { pointer, size });

        self.statistics.live_payload += size;
        self.statistics.peak_payload = self.statistics.peak_payload.max(self.statistics.live_payload);

        Ok(())
    }

    fn evict(&mut self, id: usize, live: Live) {
        if live.size > 0 {
            self.by_address.remove(&(live.pointer.as_ptr() as usize));
        }

        self.slots[id] = Slot::Vacant;
        self.statistics.live_payload -= live.size;
    }

    fn verify(&self, index: usize, id: usize, live: Live, size: usize) -> Result<(), Failure> {
        //  Safety:
        //  -   `live.pointer` is live, for at least `size` bytes.
        let bytes = unsafe { bytes_of(live.pointer, size) };

        if bytes.iter().enumerate().all(|(offset, &byte)| byte == pattern(id, offset)) {
            Ok(())
        } else {
            Err(Failure::Corrupted { index, id })
        }
    }

    fn vacant(&mut self, index: usize, id: usize) -> Result<(), Failure> {
        match self.slot(index, id)? {
            Slot::Vacant => Ok(()),
            _ => Err(Failure::InvalidId { index, id }),
        }
    }

    fn slot(&self, index: usize, id: usize) -> Result<Slot, Failure> {
        self.slots.get(id).copied().ok_or(Failure::InvalidId { index, id })
    }
}

//
//  Implementation
//

#[derive(Clone, Copy, Debug)]
enum Slot {
    Vacant,
    //  Allocated, with no memory, as for a 0-sized request.
    Empty,
    Live(Live),
}

#[derive(Clone, Copy, Debug)]
struct Live {
    pointer: NonNull<u8>,
    size: usize,
}

fn pattern(id: usize, offset: usize) -> u8 { (id.wrapping_mul(131).wrapping_add(offset) % 251) as u8 }

unsafe fn bytes_of<'a>(pointer: NonNull<u8>, size: usize) -> &'a [u8] {
    slice::from_raw_parts(pointer.as_ptr(), size)
}

unsafe fn bytes_of_mut<'a>(pointer: NonNull<u8>, size: usize) -> &'a mut [u8] {
    slice::from_raw_parts_mut(pointer.as_ptr(), size)
}
