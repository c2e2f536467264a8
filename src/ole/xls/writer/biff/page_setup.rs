//! Page setup records.

use std::io::Write;

use crate::ole::xls::XlsResult;

use super::{
    BiffVersion, byte_string, record_len, unicode_string_size, write_record_header,
    write_unicode_string,
};

/// Longest header or footer text
pub const MAX_HEADER_LEN: usize = 255;

fn write_header_footer<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    record_type: u16,
    text: &str,
) -> XlsResult<()> {
    if text.is_empty() {
        write_record_header(writer, record_type, 0)?;
        return Ok(());
    }

    match version {
        BiffVersion::Biff5 => {
            let bytes = byte_string(text);
            let cch = bytes.len().min(MAX_HEADER_LEN);
            write_record_header(writer, record_type, record_len(1 + cch)?)?;
            writer.write_all(&[cch as u8])?;
            writer.write_all(&bytes[..cch])?;
        },
        BiffVersion::Biff8 => {
            write_record_header(writer, record_type, record_len(unicode_string_size(text))?)?;
            write_unicode_string(writer, text)?;
        },
    }
    Ok(())
}

/// Write HEADER record
///
/// Record type: 0x0014
///
/// An empty text writes an empty record, which means no header.
pub fn write_header<W: Write>(writer: &mut W, version: BiffVersion, text: &str) -> XlsResult<()> {
    write_header_footer(writer, version, 0x0014, text)
}

/// Write FOOTER record
///
/// Record type: 0x0015
pub fn write_footer<W: Write>(writer: &mut W, version: BiffVersion, text: &str) -> XlsResult<()> {
    write_header_footer(writer, version, 0x0015, text)
}

/// Write HCENTER record
///
/// Record type: 0x0083
pub fn write_hcenter<W: Write>(writer: &mut W, center: bool) -> XlsResult<()> {
    write_record_header(writer, 0x0083, 2)?;
    writer.write_all(&u16::from(center).to_le_bytes())?;
    Ok(())
}

/// Write VCENTER record
///
/// Record type: 0x0084
pub fn write_vcenter<W: Write>(writer: &mut W, center: bool) -> XlsResult<()> {
    write_record_header(writer, 0x0084, 2)?;
    writer.write_all(&u16::from(center).to_le_bytes())?;
    Ok(())
}

/// Page margin records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Margin {
    Left = 0x0026,
    Right = 0x0027,
    Top = 0x0028,
    Bottom = 0x0029,
}

/// Write a LEFTMARGIN, RIGHTMARGIN, TOPMARGIN or BOTTOMMARGIN record
///
/// `inches` is stored as an IEEE 754 double.
pub fn write_margin<W: Write>(writer: &mut W, margin: Margin, inches: f64) -> XlsResult<()> {
    write_record_header(writer, margin as u16, 8)?;
    writer.write_all(&inches.to_le_bytes())?;
    Ok(())
}

/// Printer settings stored in SETUP
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub paper_size: u16,
    pub scale: u16,
    pub fit_width: u16,
    pub fit_height: u16,
    pub portrait: bool,
    pub header_margin: f64,
    pub footer_margin: f64,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            paper_size: 0,
            scale: 100,
            fit_width: 0,
            fit_height: 0,
            portrait: true,
            header_margin: 0.50,
            footer_margin: 0.50,
        }
    }
}

/// Write SETUP record
///
/// Record type: 0x00A1, Length: 34
pub fn write_setup<W: Write>(writer: &mut W, setup: &PageSetup) -> XlsResult<()> {
    // Bit 1: portrait orientation
    let grbit = u16::from(setup.portrait) << 1;

    write_record_header(writer, 0x00A1, 34)?;
    writer.write_all(&setup.paper_size.to_le_bytes())?;
    writer.write_all(&setup.scale.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // iPageStart
    writer.write_all(&setup.fit_width.to_le_bytes())?;
    writer.write_all(&setup.fit_height.to_le_bytes())?;
    writer.write_all(&grbit.to_le_bytes())?;
    writer.write_all(&0x0258u16.to_le_bytes())?; // iRes
    writer.write_all(&0x0258u16.to_le_bytes())?; // iVRes
    writer.write_all(&setup.header_margin.to_le_bytes())?;
    writer.write_all(&setup.footer_margin.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // iCopies
    Ok(())
}
