#![deny(missing_docs)]

//! Test utilities for segalloc.
//!
//! The centerpiece is the trace runner: a `Trace` is a sequence of `Op`, which a `Replay` executes against any
//! `TraceAllocator`, checking each and every result along the way.

mod rng;
mod trace;

pub use rng::Rng;
pub use trace::{Failure, Op, ParseError, Replay, Statistics, Trace, TraceAllocator};
