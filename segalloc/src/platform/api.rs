//! API of OS required services.

pub use segalloc_core::{Configuration, Region};

/// Abstraction over OS services.
pub(crate) trait Platform : Region + Send {
    /// Returns the number of bytes of address space reserved so far.
    ///
    /// The reservation is made lazily, on first growth, hence this is 0 until then.
    fn reserved(&self) -> usize;

    /// Returns the number of bytes handed out so far, that is the current break.
    fn used(&self) -> usize;
}
