//! BIFF record writer for XLS files
//!
//! This module provides functions to generate BIFF5 (Excel 5/95) and BIFF8
//! (Excel 97-2003) records.
//!
//! # BIFF Record Structure
//!
//! Each BIFF record consists of:
//! - Record type (2 bytes) - identifies the record
//! - Record length (2 bytes) - length of data in bytes
//! - Record data (variable length)
//!
//! Record functions take a `W: Write` and emit exactly one record (or one
//! record plus its CONTINUE records for the shared string table). The
//! caller collects them in a [`ByteStream`](super::byte_stream::ByteStream).

use std::borrow::Cow;
use std::io::Write;

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};

use super::super::{XlsError, XlsResult};

pub(crate) mod cells;
pub(crate) mod named_range;
pub(crate) mod page_setup;
pub(crate) mod sst;
pub(crate) mod workbook;
pub(crate) mod worksheet;

/// CONTINUE record type
pub const RECORD_CONTINUE: u16 = 0x003C;

/// BOF substream types
pub const SUBSTREAM_GLOBALS: u16 = 0x0005;
pub const SUBSTREAM_WORKSHEET: u16 = 0x0010;

/// Record format generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BiffVersion {
    /// Excel 5.0/95: "Book" stream, byte strings, 2080-byte records
    Biff5,
    /// Excel 97-2003: "Workbook" stream, shared strings, 8224-byte records
    #[default]
    Biff8,
}

impl BiffVersion {
    /// Largest record (header included) stored without CONTINUE records
    pub fn record_limit(self) -> usize {
        match self {
            BiffVersion::Biff5 => 2080,
            BiffVersion::Biff8 => 8224,
        }
    }

    /// Version field of the BOF record
    pub fn bof_version(self) -> u16 {
        match self {
            BiffVersion::Biff5 => 0x0500,
            BiffVersion::Biff8 => 0x0600,
        }
    }

    /// Name of the workbook stream inside the compound document
    pub fn stream_name(self) -> &'static str {
        match self {
            BiffVersion::Biff5 => "Book",
            BiffVersion::Biff8 => "Workbook",
        }
    }

    /// Windows-1252 for BIFF5, UTF-16 for BIFF8
    pub fn default_codepage(self) -> u16 {
        match self {
            BiffVersion::Biff5 => 0x04E4,
            BiffVersion::Biff8 => 0x04B0,
        }
    }
}

/// Write a BIFF record header
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `record_type` - BIFF record type (e.g., 0x0809 for BOF)
/// * `data_len` - Length of record data in bytes
#[inline]
pub(crate) fn write_record_header<W: Write>(
    writer: &mut W,
    record_type: u16,
    data_len: u16,
) -> XlsResult<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// Record data length as the 16-bit header field
pub(crate) fn record_len(len: usize) -> XlsResult<u16> {
    u16::try_from(len)
        .map_err(|_| XlsError::InvalidData(format!("Record data of {} bytes is too long", len)))
}

/// Check that the host stores `f64` as IEEE 754 in one of the two byte
/// orders. Values are always written with `to_le_bytes`.
pub fn check_float_layout() -> XlsResult<()> {
    const LITTLE: [u8; 8] = [0x8D, 0x97, 0x6E, 0x12, 0x83, 0xC0, 0xF3, 0x3F];
    let native = 1.2345f64.to_ne_bytes();
    let mut big = LITTLE;
    big.reverse();
    if native == LITTLE || native == big {
        Ok(())
    } else {
        Err(XlsError::UnsupportedFloatLayout)
    }
}

/// True when a BIFF8 string must be stored as UTF-16
pub(crate) fn needs_wide_encoding(s: &str) -> bool {
    s.chars().any(|c| c as u32 > 0xFF)
}

/// Windows-1252 bytes of `s` for BIFF5 records, one byte per character.
/// Characters outside the code page become `?`.
pub(crate) fn byte_string(s: &str) -> Cow<'_, [u8]> {
    if s.is_ascii() {
        return Cow::Borrowed(s.as_bytes());
    }
    let (bytes, _, had_errors) = WINDOWS_1252.encode(s);
    if !had_errors {
        return Cow::Owned(bytes.into_owned());
    }

    let mut out = Vec::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for c in s.chars() {
        let (bytes, _, bad) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if bad || bytes.len() != 1 {
            out.push(b'?');
        } else {
            out.push(bytes[0]);
        }
    }
    Cow::Owned(out)
}

/// Flag byte and character bytes of a BIFF8 string body
pub(crate) fn biff8_chars(s: &str) -> (u8, Vec<u8>) {
    if needs_wide_encoding(s) {
        let mut out = Vec::with_capacity(s.len() * 2);
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        (0x01, out)
    } else {
        (0x00, s.chars().map(|c| c as u8).collect())
    }
}

/// Character count of a BIFF8 string (UTF-16 code units)
pub(crate) fn biff8_char_count(s: &str) -> usize {
    if needs_wide_encoding(s) {
        s.encode_utf16().count()
    } else {
        s.chars().count()
    }
}

/// Encoded size of a short BIFF8 string (u8 count + flag + chars)
pub(crate) fn short_string_size(s: &str) -> usize {
    let chars = biff8_char_count(s);
    2 + if needs_wide_encoding(s) { chars * 2 } else { chars }
}

/// Encoded size of a BIFF8 string with a 16-bit count
pub(crate) fn unicode_string_size(s: &str) -> usize {
    short_string_size(s) + 1
}

/// XLUnicodeString: u16 count, flag, characters
pub(crate) fn write_unicode_string<W: Write>(writer: &mut W, value: &str) -> XlsResult<()> {
    let (flag, chars) = biff8_chars(value);
    writer.write_all(&(biff8_char_count(value) as u16).to_le_bytes())?;
    writer.write_all(&[flag])?;
    writer.write_all(&chars)?;
    Ok(())
}

/// ShortXLUnicodeString: u8 count, flag, characters
pub(crate) fn write_short_unicode_string<W: Write>(writer: &mut W, value: &str) -> XlsResult<()> {
    let (flag, chars) = biff8_chars(value);
    writer.write_all(&[biff8_char_count(value) as u8, flag])?;
    writer.write_all(&chars)?;
    Ok(())
}
