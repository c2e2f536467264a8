//! Worksheet-level record writers.

use crate::ole::xls::{XlsError, XlsResult};
use std::io::Write;

use super::{BiffVersion, write_record_header};

/// WINDOW2 option flags
pub mod window2 {
    pub const DISPLAY_GRIDLINES: u16 = 0x0002;
    pub const DISPLAY_HEADINGS: u16 = 0x0004;
    pub const FROZEN: u16 = 0x0008;
    pub const DISPLAY_ZEROS: u16 = 0x0010;
    pub const DEFAULT_HEADER_COLOR: u16 = 0x0020;
    pub const DISPLAY_GUTS: u16 = 0x0080;
    pub const SELECTED: u16 = 0x0200;
    pub const ACTIVE: u16 = 0x0400;
}

/// Write a record holding a single 16-bit value
fn write_u16_record<W: Write>(writer: &mut W, record_type: u16, value: u16) -> XlsResult<()> {
    write_record_header(writer, record_type, 2)?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write WSBOOL record (Additional Workspace Information)
///
/// Record type: 0x0081, Length: 2
///
/// 0x04C1 shows outline symbols with summary rows below and columns to
/// the right. Bit 8 switches printing to fit-to-page mode.
pub fn write_wsbool<W: Write>(writer: &mut W, fit_to_page: bool) -> XlsResult<()> {
    let mut grbit = 0x04C1u16;
    if fit_to_page {
        grbit |= 0x0100;
    }
    write_u16_record(writer, 0x0081, grbit)
}

/// Write PRINTHEADERS record
///
/// Record type: 0x002A
pub fn write_print_headers<W: Write>(writer: &mut W, print: bool) -> XlsResult<()> {
    write_u16_record(writer, 0x002A, u16::from(print))
}

/// Write PRINTGRIDLINES record
///
/// Record type: 0x002B
pub fn write_print_gridlines<W: Write>(writer: &mut W, print: bool) -> XlsResult<()> {
    write_u16_record(writer, 0x002B, u16::from(print))
}

/// Write GRIDSET record
///
/// Record type: 0x0082
///
/// Set when the print gridlines option has never been changed.
pub fn write_gridset<W: Write>(writer: &mut W, print_gridlines: bool) -> XlsResult<()> {
    write_u16_record(writer, 0x0082, u16::from(!print_gridlines))
}

/// Write GUTS record with no outline levels (BIFF5)
///
/// Record type: 0x0080
pub fn write_guts<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x0080, 8)?;
    writer.write_all(&[0u8; 8])?;
    Ok(())
}

/// Write DEFCOLWIDTH record
///
/// Record type: 0x0055
pub fn write_defcolwidth<W: Write>(writer: &mut W, width: u16) -> XlsResult<()> {
    write_u16_record(writer, 0x0055, width)
}

/// Write COLINFO record (column width and format)
///
/// Record type: 0x007D
///
/// Widths are in characters; Excel subtracts 0.72 when displaying them.
pub fn write_colinfo<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    first_col: u16,
    last_col: u16,
    width: f64,
    xf_index: u16,
    hidden: bool,
) -> XlsResult<()> {
    let coldx = ((width + 0.72) * 256.0).clamp(0.0, f64::from(u16::MAX)) as u16;
    let grbit = u16::from(hidden);

    match version {
        BiffVersion::Biff5 => write_record_header(writer, 0x007D, 11)?,
        BiffVersion::Biff8 => write_record_header(writer, 0x007D, 12)?,
    }
    writer.write_all(&first_col.to_le_bytes())?;
    writer.write_all(&last_col.to_le_bytes())?;
    writer.write_all(&coldx.to_le_bytes())?;
    writer.write_all(&xf_index.to_le_bytes())?;
    writer.write_all(&grbit.to_le_bytes())?;
    match version {
        BiffVersion::Biff5 => writer.write_all(&[0x00])?,
        BiffVersion::Biff8 => writer.write_all(&0u16.to_le_bytes())?,
    }
    Ok(())
}

/// Write ROW record
///
/// Record type: 0x0208
///
/// # Arguments
///
/// * `height` - Row height in points; `None` keeps the default height
/// * `xf_index` - Row format, if any
/// * `hidden` - Hide the row
/// * `level` - Outline level (0-7)
pub fn write_row<W: Write>(
    writer: &mut W,
    row: u16,
    height: Option<f64>,
    xf_index: Option<u16>,
    hidden: bool,
    level: u8,
) -> XlsResult<()> {
    let miy_rw = match height {
        Some(points) => (points * 20.0).clamp(0.0, f64::from(0x7FFF)) as u16,
        None => 0x00FF,
    };

    let mut grbit = u16::from(level.min(7));
    if hidden {
        grbit |= 0x0020;
    }
    grbit |= 0x0040;
    if xf_index.is_some() {
        grbit |= 0x0080;
    }
    grbit |= 0x0100;

    write_record_header(writer, 0x0208, 16)?;
    writer.write_all(&row.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // colMic
    writer.write_all(&0u16.to_le_bytes())?; // colMac
    writer.write_all(&miy_rw.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // irwMac
    writer.write_all(&0u16.to_le_bytes())?; // reserved
    writer.write_all(&grbit.to_le_bytes())?;
    writer.write_all(&xf_index.unwrap_or(0x0F).to_le_bytes())?;
    Ok(())
}

/// Write DIMENSIONS record (worksheet dimensions)
///
/// Record type: 0x0000 (BIFF5) or 0x0200 (BIFF8)
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `first_row` - First used row
/// * `last_row` - Last used row + 1
/// * `first_col` - First used column
/// * `last_col` - Last used column + 1
pub fn write_dimensions<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    first_row: u32,
    last_row: u32,
    first_col: u16,
    last_col: u16,
) -> XlsResult<()> {
    match version {
        BiffVersion::Biff5 => {
            write_record_header(writer, 0x0000, 10)?;
            writer.write_all(&(first_row as u16).to_le_bytes())?;
            writer.write_all(&(last_row.min(u32::from(u16::MAX)) as u16).to_le_bytes())?;
        },
        BiffVersion::Biff8 => {
            write_record_header(writer, 0x0200, 14)?;
            writer.write_all(&first_row.to_le_bytes())?;
            writer.write_all(&last_row.to_le_bytes())?;
        },
    }
    writer.write_all(&first_col.to_le_bytes())?;
    writer.write_all(&last_col.to_le_bytes())?;

    // Reserved (must be 0)
    writer.write_all(&0u16.to_le_bytes())?;

    Ok(())
}

/// Write PROTECT record
///
/// Record type: 0x0012
pub fn write_protect<W: Write>(writer: &mut W, protected: bool) -> XlsResult<()> {
    write_u16_record(writer, 0x0012, u16::from(protected))
}

/// Write PASSWORD record
///
/// Record type: 0x0013
pub fn write_password<W: Write>(writer: &mut W, hash: u16) -> XlsResult<()> {
    write_u16_record(writer, 0x0013, hash)
}

/// Legacy sheet protection password hash.
///
/// Each byte is rotated left within 15 bits by its 1-based position and
/// xored into the result, which is then xored with the length and 0xCE4B.
pub fn password_hash(password: &str) -> u16 {
    let bytes = password.as_bytes();
    let mut hash = 0u16;
    for (i, &byte) in bytes.iter().enumerate() {
        let value = u64::from(byte).checked_shl(i as u32 + 1).unwrap_or(0);
        let low = value & 0x7FFF;
        let high = (value & (0x7FFF << 15)) >> 15;
        hash ^= (low | high) as u16;
    }
    hash ^= bytes.len() as u16;
    hash ^ 0xCE4B
}

/// Write WINDOW2 record (worksheet view settings)
///
/// Record type: 0x023E, Length: 10 (BIFF5) or 18 (BIFF8)
pub fn write_window2<W: Write>(writer: &mut W, version: BiffVersion, grbit: u16) -> XlsResult<()> {
    match version {
        BiffVersion::Biff5 => {
            write_record_header(writer, 0x023E, 10)?;
            writer.write_all(&grbit.to_le_bytes())?;
            writer.write_all(&0u16.to_le_bytes())?; // rwTop
            writer.write_all(&0u16.to_le_bytes())?; // colLeft
            writer.write_all(&0u32.to_le_bytes())?; // rgbHdr
        },
        BiffVersion::Biff8 => {
            write_record_header(writer, 0x023E, 18)?;
            writer.write_all(&grbit.to_le_bytes())?;
            writer.write_all(&0u16.to_le_bytes())?; // rwTop
            writer.write_all(&0u16.to_le_bytes())?; // colLeft
            writer.write_all(&0x0040u16.to_le_bytes())?; // icvHdr
            writer.write_all(&0u16.to_le_bytes())?; // reserved
            writer.write_all(&0u16.to_le_bytes())?; // wScaleSLV
            writer.write_all(&0u16.to_le_bytes())?; // wScaleNormal
            writer.write_all(&0u32.to_le_bytes())?; // reserved
        },
    }
    Ok(())
}

/// Write SCL record (zoom factor as a fraction of 100)
///
/// Record type: 0x00A0
pub fn write_scl<W: Write>(writer: &mut W, zoom: u16) -> XlsResult<()> {
    write_record_header(writer, 0x00A0, 4)?;
    writer.write_all(&zoom.to_le_bytes())?;
    writer.write_all(&100u16.to_le_bytes())?;
    Ok(())
}

/// Write PANE record
///
/// Record type: 0x0041
///
/// For frozen panes `x` and `y` are the column and row counts of the
/// frozen area; for split panes they are positions in twips.
pub fn write_pane<W: Write>(
    writer: &mut W,
    x: u16,
    y: u16,
    top_row: u16,
    left_col: u16,
    active_pane: u8,
) -> XlsResult<()> {
    write_record_header(writer, 0x0041, 10)?;
    writer.write_all(&x.to_le_bytes())?;
    writer.write_all(&y.to_le_bytes())?;
    writer.write_all(&top_row.to_le_bytes())?;
    writer.write_all(&left_col.to_le_bytes())?;
    writer.write_all(&u16::from(active_pane).to_le_bytes())?;
    Ok(())
}

/// Write SELECTION record
///
/// Record type: 0x001D
///
/// The active cell is the first cell of the range. A reversed range is
/// normalised first.
pub fn write_selection<W: Write>(
    writer: &mut W,
    pane: u8,
    first_row: u16,
    first_col: u16,
    last_row: u16,
    last_col: u16,
) -> XlsResult<()> {
    let (first_row, last_row) = (first_row.min(last_row), first_row.max(last_row));
    let (first_col, last_col) = (first_col.min(last_col), first_col.max(last_col));

    write_record_header(writer, 0x001D, 15)?;
    writer.write_all(&[pane])?;
    writer.write_all(&first_row.to_le_bytes())?; // rwAct
    writer.write_all(&first_col.to_le_bytes())?; // colAct
    writer.write_all(&0u16.to_le_bytes())?; // irefAct
    writer.write_all(&1u16.to_le_bytes())?; // cref
    writer.write_all(&first_row.to_le_bytes())?;
    writer.write_all(&last_row.to_le_bytes())?;
    writer.write_all(&[first_col as u8, last_col as u8])?;
    Ok(())
}

/// Write MERGEDCELLS records
///
/// Record type: 0x00E5
///
/// Ranges are `(first_row, last_row, first_col, last_col)`. Each record
/// holds as many ranges as fit in the version's record limit (1027 for
/// BIFF8).
pub fn write_mergedcells<W, I>(writer: &mut W, version: BiffVersion, ranges: I) -> XlsResult<()>
where
    W: Write,
    I: IntoIterator<Item = (u32, u32, u16, u16)>,
{
    let max_regions = (version.record_limit() - 6) / 8;
    let mut chunk: Vec<(u16, u16, u16, u16)> = Vec::new();

    for (first_row, last_row, first_col, last_col) in ranges {
        let row = |value: u32| {
            u16::try_from(value).map_err(|_| {
                XlsError::InvalidData(format!(
                    "Row index {} exceeds limit 65535 for MERGEDCELLS record",
                    value
                ))
            })
        };
        chunk.push((row(first_row)?, row(last_row)?, first_col, last_col));

        if chunk.len() == max_regions {
            write_mergedcells_chunk(writer, &chunk)?;
            chunk.clear();
        }
    }

    if !chunk.is_empty() {
        write_mergedcells_chunk(writer, &chunk)?;
    }

    Ok(())
}

fn write_mergedcells_chunk<W: Write>(
    writer: &mut W,
    ranges: &[(u16, u16, u16, u16)],
) -> XlsResult<()> {
    let count = ranges.len() as u16;
    write_record_header(writer, 0x00E5, 2 + count * 8)?;
    writer.write_all(&count.to_le_bytes())?;

    for &(first_row, last_row, first_col, last_col) in ranges {
        writer.write_all(&first_row.to_le_bytes())?;
        writer.write_all(&last_row.to_le_bytes())?;
        writer.write_all(&first_col.to_le_bytes())?;
        writer.write_all(&last_col.to_le_bytes())?;
    }

    Ok(())
}
