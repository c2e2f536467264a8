//! A1-style cell names
//!
//! Columns use bijective base-26 letters (`A` = 0, `Z` = 25, `AA` = 26),
//! rows are written 1-based. A `$` before either part marks it absolute.

use super::super::{XlsError, XlsResult};

/// A parsed A1-style reference, 0-based, with relative flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl CellRef {
    /// Parse `$?[A-Za-z]+$?[0-9]+`.
    ///
    /// Only the syntax is checked here; the returned row and column may be
    /// outside the sheet. Returns `None` for anything else, including row 0.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut pos = 0;

        let col_relative = bytes.first() != Some(&b'$');
        if !col_relative {
            pos += 1;
        }
        let letters_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == letters_start {
            return None;
        }
        let col = letters_to_number(&text[letters_start..pos])?;

        let row_relative = bytes.get(pos) != Some(&b'$');
        if !row_relative {
            pos += 1;
        }
        let digits = &text[pos..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let row = digits
            .bytes()
            .fold(0u32, |acc, b| acc.saturating_mul(10).saturating_add(u32::from(b - b'0')));
        if row == 0 {
            return None;
        }

        Some(Self {
            row: row - 1,
            col,
            row_relative,
            col_relative,
        })
    }
}

/// Letters to a 0-based column number, saturating on absurdly long input
fn letters_to_number(letters: &str) -> Option<u32> {
    let mut col = 0u32;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.saturating_mul(26).saturating_add(digit);
    }
    col.checked_sub(1)
}

/// Convert a 0-based column index to its letters.
///
/// ```rust
/// # use longan::column_letter;
/// assert_eq!(column_letter(0), "A");
/// assert_eq!(column_letter(701), "ZZ");
/// assert_eq!(column_letter(702), "AAA");
/// ```
pub fn column_letter(col: u16) -> String {
    let mut letters = [0u8; 4];
    let mut len = 0;
    let mut n = u32::from(col) + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    letters[..len].iter().rev().map(|&b| b as char).collect()
}

/// Convert column letters (case-insensitive) to a 0-based index
pub fn column_index(letters: &str) -> XlsResult<u16> {
    if letters.is_empty() {
        return Err(XlsError::InvalidCellReference(letters.to_string()));
    }
    letters_to_number(letters)
        .and_then(|col| u16::try_from(col).ok())
        .ok_or_else(|| XlsError::InvalidCellReference(letters.to_string()))
}

/// Convert a 0-based (row, col) pair to an A1-style name such as `C5`
pub fn rowcol_to_cell(row: u32, col: u16) -> String {
    let mut name = column_letter(col);
    let mut buffer = itoa::Buffer::new();
    name.push_str(buffer.format(u64::from(row) + 1));
    name
}

/// Same as [`rowcol_to_cell`] with `$` markers for absolute parts
pub fn rowcol_to_cell_abs(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> String {
    let mut name = String::new();
    if col_absolute {
        name.push('$');
    }
    name.push_str(&column_letter(col));
    if row_absolute {
        name.push('$');
    }
    let mut buffer = itoa::Buffer::new();
    name.push_str(buffer.format(u64::from(row) + 1));
    name
}

/// Convert an A1-style name (with optional `$` markers) to a 0-based
/// (row, col) pair
pub fn cell_to_rowcol(cell: &str) -> XlsResult<(u32, u16)> {
    let parsed = CellRef::parse(cell.trim())
        .ok_or_else(|| XlsError::InvalidCellReference(cell.to_string()))?;
    let col =
        u16::try_from(parsed.col).map_err(|_| XlsError::InvalidCellReference(cell.to_string()))?;
    Ok((parsed.row, col))
}
