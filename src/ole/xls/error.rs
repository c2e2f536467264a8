//! Error types for the XLS writer

use thiserror::Error;

use crate::ole::OleError;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur while building a workbook
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compound document error: {0}")]
    Ole(#[from] OleError),

    /// Sheet names are limited to 31 characters
    #[error("Sheet name '{name}' must be at most 31 characters")]
    SheetNameTooLong { name: String },

    #[error("Worksheet '{name}' already exists")]
    DuplicateSheetName { name: String },

    #[error("Cell ({row}, {col}) is outside the 65536 x 256 sheet")]
    CellOutOfRange { row: u32, col: u32 },

    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("Cell ({row}, {col}) text of {len} characters exceeds {max}")]
    StringTooLong {
        row: u32,
        col: u32,
        len: usize,
        max: usize,
    },

    #[error("Color index {0} is outside [8, 64]")]
    ColorIndexOutOfRange(u32),

    #[error("Color component {component} = {value} is outside [0, 255]")]
    ColorComponentOutOfRange { component: char, value: u32 },

    /// The host does not store `f64` as IEEE 754 in either byte order
    #[error("Unsupported floating point byte layout")]
    UnsupportedFloatLayout,

    #[error("Workbook is already closed")]
    WorkbookClosed,

    #[error("Worksheet {0} not found")]
    WorksheetNotFound(usize),

    #[error("Format {0} not found")]
    FormatNotFound(usize),

    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Errors raised while compiling a formula to parsed tokens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unknown sheet '{0}'")]
    UnknownSheet(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function {function} expects {expected} arguments, found {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Missing ',' after argument {argument} of {function}")]
    MissingComma { function: String, argument: usize },

    #[error("Missing ')'")]
    MissingCloseParen,

    #[error("String literal of {0} characters exceeds 255")]
    StringTooLong(usize),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Column out of range in '{0}'")]
    ColumnOutOfRange(String),

    #[error("Row out of range in '{0}'")]
    RowOutOfRange(String),

    #[error("Empty formula")]
    EmptyFormula,
}
