//! XLS file writing module
//!
//! Builds legacy binary Excel workbooks (.xls). Records are generated in
//! the BIFF5 or BIFF8 layout and stored in a compound document through
//! [`OleWriter`](crate::ole::OleWriter).

/// BIFF record generation
pub(crate) mod biff;

/// Record accumulator with CONTINUE splitting
pub mod byte_stream;

/// A1-style cell names
pub mod cell_ref;

/// Workbook and worksheet state
mod core;

/// Cell formatting (fonts, XF records, palette)
pub mod formatting;

/// Formula compilation
pub mod formula;

#[cfg(test)]
mod tests;

pub use biff::{BiffVersion, check_float_layout};
pub use byte_stream::ByteStream;
pub use cell_ref::{CellRef, cell_to_rowcol, column_index, column_letter, rowcol_to_cell};
pub use core::{CellValue, Workbook, WorkbookOptions};
pub use formatting::{
    BorderStyle, Color, Format, FormatProperties, HorizontalAlignment, TextRotation,
    VerticalAlignment,
};
pub use formula::FormulaCompiler;
