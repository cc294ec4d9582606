//! The API of segalloc-core.

mod configuration;
mod error;
mod heap;
mod region;

pub use configuration::{Configuration, Properties, SizeClass};
pub use error::{AllocError, Corruption};
pub use heap::{BlockInfo, Blocks, Heap};
pub use region::Region;
pub use crate::utils::PowerOf2;
