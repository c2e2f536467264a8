//! Longan - A Rust library for writing legacy Excel (.xls) workbooks
//!
//! This library generates binary spreadsheet files in the BIFF5 (Excel 95)
//! and BIFF8 (Excel 97-2003) record formats, stored in an OLE2 compound
//! document. Files are written in one pass from data held in memory;
//! reading existing files is out of scope.
//!
//! # Features
//!
//! - **Compound document builder**: storages and streams with big and
//!   small block allocation, balanced directory tree, extended FAT chains
//! - **Workbook writer**: numbers, strings (shared string table), formulas,
//!   links and blank cells across multiple worksheets
//! - **Formula compiler**: arithmetic, comparison, concatenation, 2-D and
//!   3-D references and built-in functions compiled to parsed tokens
//! - **Formatting**: fonts, alignment, borders, fills, number formats and
//!   a customizable color palette
//! - **Page setup**: headers, footers, margins, print areas and titles
//!
//! # Example - Writing a workbook
//!
//! ```no_run
//! use longan::{FormatProperties, Workbook};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = Workbook::new()?;
//! let sheet = workbook.add_worksheet("Sales")?;
//! let header = workbook.add_format(FormatProperties {
//!     bold: true,
//!     fg_color: Some("yellow".into()),
//!     ..Default::default()
//! })?;
//!
//! workbook.write(sheet, 0, 0, "Region", Some(header))?;
//! workbook.write(sheet, 0, 1, "Amount", Some(header))?;
//! workbook.write(sheet, 1, 0, "North", None)?;
//! workbook.write(sheet, 1, 1, 1250.5, None)?;
//! workbook.write(sheet, 2, 1, "=SUM(B2:B2)", None)?;
//! workbook.freeze_panes(sheet, 1, 0)?;
//!
//! workbook.save("sales.xls")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level compound document
//!
//! ```no_run
//! use longan::OleWriter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ole = OleWriter::new();
//! let root = ole.root();
//! let storage = ole.add_storage(root, "Data")?;
//! ole.add_stream(storage, "Payload", b"hello".to_vec())?;
//! ole.save("container.bin")?;
//! # Ok(())
//! # }
//! ```

/// OLE2 compound document writer and the XLS writer built on it
pub mod ole;

pub use ole::xls::{
    BiffVersion, CellValue, Format, FormatProperties, FormulaError, Workbook, WorkbookOptions,
    XlsError, XlsResult, cell_to_rowcol, column_index, column_letter, rowcol_to_cell,
};
pub use ole::{OleError, OleResult, OleWriter, OleWriterOptions};
