//! Workbook globals records.

use crate::ole::xls::XlsResult;
use std::io::Write;

use super::{
    BiffVersion, byte_string, record_len, short_string_size, write_record_header,
    write_short_unicode_string, write_unicode_string,
};

/// Write BOF (Beginning of File) record
///
/// Record type: 0x0809
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `version` - Record format generation
/// * `substream_type` - Type of substream (0x0005 = Workbook, 0x0010 = Worksheet)
pub fn write_bof<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    substream_type: u16,
) -> XlsResult<()> {
    match version {
        BiffVersion::Biff5 => {
            write_record_header(writer, 0x0809, 8)?;
            writer.write_all(&version.bof_version().to_le_bytes())?;
            writer.write_all(&substream_type.to_le_bytes())?;
            // Build identifier and year
            writer.write_all(&0x096Cu16.to_le_bytes())?;
            writer.write_all(&0x07C9u16.to_le_bytes())?;
        },
        BiffVersion::Biff8 => {
            write_record_header(writer, 0x0809, 16)?;
            writer.write_all(&version.bof_version().to_le_bytes())?;
            writer.write_all(&substream_type.to_le_bytes())?;
            writer.write_all(&0x0DBBu16.to_le_bytes())?;
            writer.write_all(&0x07CCu16.to_le_bytes())?;
            // File history flags
            writer.write_all(&0u32.to_le_bytes())?;
            // Lowest BIFF version
            writer.write_all(&6u32.to_le_bytes())?;
        },
    }
    Ok(())
}

/// Write EOF (End of File) record
///
/// Record type: 0x000A
pub fn write_eof<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x000A, 0)?;
    Ok(())
}

/// Write CODEPAGE record
///
/// Record type: 0x0042
pub fn write_codepage<W: Write>(writer: &mut W, codepage: u16) -> XlsResult<()> {
    write_record_header(writer, 0x0042, 2)?;
    writer.write_all(&codepage.to_le_bytes())?;
    Ok(())
}

/// Write DATEMODE record
///
/// Record type: 0x0022
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `is_1904` - True for 1904 date system (Mac), false for 1900 (Windows)
pub fn write_datemode<W: Write>(writer: &mut W, is_1904: bool) -> XlsResult<()> {
    write_record_header(writer, 0x0022, 2)?;
    writer.write_all(&u16::from(is_1904).to_le_bytes())?;
    Ok(())
}

/// Write WINDOW1 record (workbook window properties)
///
/// Record type: 0x003D
///
/// # Arguments
///
/// * `active` - Index of the sheet shown when the file is opened
/// * `first_tab` - First sheet tab displayed in the tab bar
/// * `selected` - Number of selected sheets
pub fn write_window1<W: Write>(
    writer: &mut W,
    active: u16,
    first_tab: u16,
    selected: u16,
) -> XlsResult<()> {
    write_record_header(writer, 0x003D, 18)?;

    writer.write_all(&0u16.to_le_bytes())?; // xWn
    writer.write_all(&0u16.to_le_bytes())?; // yWn
    writer.write_all(&0x25BCu16.to_le_bytes())?; // dxWn
    writer.write_all(&0x1572u16.to_le_bytes())?; // dyWn
    writer.write_all(&0x0038u16.to_le_bytes())?; // grbit
    writer.write_all(&active.to_le_bytes())?;
    writer.write_all(&first_tab.to_le_bytes())?;
    writer.write_all(&selected.to_le_bytes())?;
    writer.write_all(&0x0258u16.to_le_bytes())?; // wTabRatio

    Ok(())
}

/// Write EXTERNCOUNT record (BIFF5)
///
/// Record type: 0x0016
pub fn write_externcount<W: Write>(writer: &mut W, count: u16) -> XlsResult<()> {
    write_record_header(writer, 0x0016, 2)?;
    writer.write_all(&count.to_le_bytes())?;
    Ok(())
}

/// Write a BIFF5 EXTERNSHEET record
///
/// Record type: 0x0017
///
/// A reference to another sheet stores its name with the 0x03 marker.
/// Passing `None` writes the short form a worksheet uses for itself.
pub fn write_externsheet_biff5<W: Write>(writer: &mut W, sheet: Option<&str>) -> XlsResult<()> {
    match sheet {
        Some(name) => {
            let bytes = byte_string(name);
            let cch = bytes.len().min(u8::MAX as usize);
            write_record_header(writer, 0x0017, record_len(2 + cch)?)?;
            writer.write_all(&[cch as u8, 0x03])?;
            writer.write_all(&bytes[..cch])?;
        },
        None => {
            write_record_header(writer, 0x0017, 2)?;
            writer.write_all(&[0x01, 0x02])?;
        },
    }
    Ok(())
}

/// Write SUPBOOK record for the internal workbook.
///
/// Record type: 0x01AE
///
/// - cTab (2 bytes): number of sheets in the workbook
/// - reserved (2 bytes): MUST be 0x0401
pub fn write_supbook_internal<W: Write>(writer: &mut W, sheet_count: u16) -> XlsResult<()> {
    write_record_header(writer, 0x01AE, 4)?;
    writer.write_all(&sheet_count.to_le_bytes())?;
    writer.write_all(&0x0401u16.to_le_bytes())?;
    Ok(())
}

/// Write BIFF8 EXTERNSHEET record
///
/// Record type: 0x0017
///
/// Each XTI entry is `(first, last)` sheet index in the internal SUPBOOK.
/// Formula and NAME tokens refer to entries by position.
pub fn write_externsheet_biff8<W: Write>(writer: &mut W, entries: &[(u16, u16)]) -> XlsResult<()> {
    write_record_header(writer, 0x0017, record_len(2 + entries.len() * 6)?)?;
    writer.write_all(&(entries.len() as u16).to_le_bytes())?;
    for &(first, last) in entries {
        writer.write_all(&0u16.to_le_bytes())?; // ixSupBook
        writer.write_all(&first.to_le_bytes())?;
        writer.write_all(&last.to_le_bytes())?;
    }
    Ok(())
}

/// Total size (header included) of the BOUNDSHEET record for `name`
pub fn boundsheet_size(version: BiffVersion, name: &str) -> usize {
    match version {
        BiffVersion::Biff5 => 4 + 6 + 1 + byte_string(name).len(),
        BiffVersion::Biff8 => 4 + 6 + short_string_size(name),
    }
}

/// Write BOUNDSHEET record (worksheet metadata)
///
/// Record type: 0x0085
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `version` - Record format generation
/// * `position` - Absolute stream position of BOF record for this sheet
/// * `name` - Sheet name (max 31 characters)
pub fn write_boundsheet<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    position: u32,
    name: &str,
) -> XlsResult<()> {
    let data_len = boundsheet_size(version, name) - 4;
    write_record_header(writer, 0x0085, record_len(data_len)?)?;

    writer.write_all(&position.to_le_bytes())?;
    // Visible worksheet
    writer.write_all(&0x0000u16.to_le_bytes())?;

    match version {
        BiffVersion::Biff5 => {
            let bytes = byte_string(name);
            writer.write_all(&[bytes.len() as u8])?;
            writer.write_all(&bytes)?;
        },
        BiffVersion::Biff8 => write_short_unicode_string(writer, name)?,
    }

    Ok(())
}

/// Write the STYLE record for the built-in Normal style
///
/// Record type: 0x0293
///
/// Bit 15 marks a built-in style; the low 12 bits hold the XF index.
pub fn write_style<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x0293, 4)?;
    writer.write_all(&0x8000u16.to_le_bytes())?;
    // Normal, no outline level
    writer.write_all(&[0x00, 0xFF])?;
    Ok(())
}

/// Write FORMAT record (number format string)
///
/// Record type: 0x041E
pub fn write_format_record<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    index_code: u16,
    format_str: &str,
) -> XlsResult<()> {
    match version {
        BiffVersion::Biff5 => {
            let bytes = byte_string(format_str);
            let cch = bytes.len().min(u8::MAX as usize);
            write_record_header(writer, 0x041E, record_len(3 + cch)?)?;
            writer.write_all(&index_code.to_le_bytes())?;
            writer.write_all(&[cch as u8])?;
            writer.write_all(&bytes[..cch])?;
        },
        BiffVersion::Biff8 => {
            let data_len = 2 + super::unicode_string_size(format_str);
            write_record_header(writer, 0x041E, record_len(data_len)?)?;
            writer.write_all(&index_code.to_le_bytes())?;
            write_unicode_string(writer, format_str)?;
        },
    }
    Ok(())
}

/// Write COUNTRY record
///
/// Record type: 0x008C
///
/// Both the user interface and the system country are set to `code`.
pub fn write_country<W: Write>(writer: &mut W, code: u16) -> XlsResult<()> {
    write_record_header(writer, 0x008C, 4)?;
    writer.write_all(&code.to_le_bytes())?;
    writer.write_all(&code.to_le_bytes())?;
    Ok(())
}

/// Write PALETTE record
///
/// Record type: 0x0092
///
/// Colors are stored as RGB with a zero fourth byte, starting at palette
/// index 8.
pub fn write_palette<W: Write>(writer: &mut W, colors: &[[u8; 3]]) -> XlsResult<()> {
    write_record_header(writer, 0x0092, record_len(2 + colors.len() * 4)?)?;
    writer.write_all(&(colors.len() as u16).to_le_bytes())?;
    for &[r, g, b] in colors {
        writer.write_all(&[r, g, b, 0x00])?;
    }
    Ok(())
}
