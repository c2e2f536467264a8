//! Compound document (OLE2) writer
//!
//! Builds a complete compound file from an in-memory tree of storages and
//! streams. Only writing is supported; the layout is computed up front and
//! the file is emitted in a single pass.

/// Directory entries and the entry arena
mod pps;

/// Median-split flattening of the entry tree
mod tree;

/// Block accounting
mod layout;

/// Allocation table generation
mod fat;

/// Small block table and ministream
mod minifat;

/// XBAT generation
mod difat;

/// Directory entry serialization
mod directory;

/// Header generation
mod header;

/// Core OLE writer implementation
mod core;

#[cfg(test)]
mod tests;

pub use core::{OleWriter, OleWriterOptions};
pub use directory::to_filetime;
pub use layout::{BlockLayout, allocation_table_blocks};
pub use pps::{Pps, PpsArena, PpsId, PpsKind};
pub use tree::FlatEntry;
