//! OLE2 compound document support
//!
//! Only the write side is implemented: a directory tree of storages and
//! streams is assembled in memory and serialized in one pass. The `xls`
//! submodule builds the BIFF workbook stream that is stored inside it.

/// Constants for OLE file format
pub mod consts;

/// Error type shared by the container builder
mod error;

/// Compound document writer
pub mod writer;

/// Legacy Excel (.xls) workbook writer
pub mod xls;

pub use error::{OleError, OleResult};
pub use writer::{OleWriter, OleWriterOptions};
