//! The internals of segalloc-core.
//!
//! The internals provide all the heavy-lifting.

pub mod arena;
pub mod free_lists;
pub mod heap;
pub mod link;
pub mod tag;
