use thiserror::Error;

/// Errors raised while building a compound document
#[derive(Error, Debug)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Directory entry names are limited to 31 UTF-16 code units
    #[error("Entry name '{name}' exceeds 31 UTF-16 code units")]
    NameTooLong { name: String },

    #[error("Unsupported block size exponent: {shift}")]
    UnsupportedBlockSize { shift: u16 },

    /// The allocation tables or directory tree do not describe a consistent file.
    #[error("Corrupted layout: {0}")]
    CorruptedLayout(String),
}

pub type OleResult<T> = Result<T, OleError>;
