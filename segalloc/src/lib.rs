#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

//! A compact, single-region, memory allocator library.
//!
//! The type `SegAllocator` provides a general-purpose memory allocator, as a drop-in replacement for regular
//! allocators.
//!
//! #   Warning
//!
//! This allocator serializes all operations behind a single lock, and never returns memory to the OS. It favors
//! memory utilization over throughput, and is not suitable for heavily multi-threaded applications.

mod allocator;
mod platform;

pub use allocator::SegAllocator;
pub use segalloc_core::AllocError;

use platform::{Configuration, Platform, SegConfiguration, MmapRegion};
