//! Command implementations for the seam binary.

pub mod index;
pub mod map;

pub use index::IndexCommand;
pub use map::MemCommand;
