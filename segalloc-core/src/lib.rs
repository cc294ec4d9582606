#![cfg_attr(not(test), no_std)]

#![deny(missing_docs)]

//! Building blocks for a compact, single-region memory allocator.
//!
//! segalloc-core carves a single, contiguous, monotonically growing region into blocks. It contains:
//! -   A region trait, used to request additional raw memory at the high end of the region.
//! -   A configuration trait, fixing the alignment unit and the maximum size of the region.
//! -   A `Heap` type, exposing allocate, release, resize and zero-allocate over a given region.
//!
//! Blocks use boundary tags: a single 32-bits tag word in front of every block, and an additional trailing tag for
//! free blocks only. Free blocks are indexed in 5 segregated lists, linked by 32-bits offsets from the region base.

#[macro_use]
mod macros;

mod api;
mod internals;
mod utils;

pub use api::*;
