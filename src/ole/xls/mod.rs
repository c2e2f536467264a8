//! Legacy Excel (.xls) workbook writer
//!
//! Workbooks are written in the BIFF5 or BIFF8 record format and stored
//! in an OLE2 compound document, as Excel 95 and Excel 97-2003 expect.

/// Error types for the XLS writer
mod error;

/// Workbook, worksheet and record generation
pub mod writer;

pub use error::{FormulaError, XlsError, XlsResult};
pub use writer::{
    BiffVersion, CellValue, Format, FormatProperties, Workbook, WorkbookOptions, cell_to_rowcol,
    column_index, column_letter, rowcol_to_cell,
};
