//! Built-in NAME records.
//!
//! Print areas and print titles are stored as sheet-local built-in names
//! whose definition is a 3-D area reference into the owning sheet. BIFF5
//! uses a fixed record image with the sheet index baked into the external
//! reference; BIFF8 encodes a `PtgArea3d` that points at an XTI entry of
//! the EXTERNSHEET record.

use std::io::Write;

use crate::ole::xls::XlsResult;

use super::super::formula::ptg::{PTG_AREA_3D, PTG_MEM_FUNC, PTG_UNION};
use super::{BiffVersion, record_len, write_record_header};

const RECORD_NAME: u16 = 0x0018;

/// Built-in name codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BuiltinName {
    PrintArea = 0x06,
    PrintTitles = 0x07,
}

/// Inclusive cell rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellArea {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u16,
    pub last_col: u16,
}

impl CellArea {
    pub fn new(first_row: u16, last_row: u16, first_col: u16, last_col: u16) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }
}

/// Fields shared by both BIFF5 record forms up to the built-in code
fn write_biff5_prefix<W: Write>(
    writer: &mut W,
    data_len: u16,
    cce: u16,
    sheet: u16,
    kind: BuiltinName,
) -> XlsResult<()> {
    let ixals = sheet + 1;
    write_record_header(writer, RECORD_NAME, data_len)?;
    writer.write_all(&0x0020u16.to_le_bytes())?; // grbit: fBuiltin
    writer.write_all(&[0x00, 0x01])?; // chKey, cch
    writer.write_all(&cce.to_le_bytes())?;
    writer.write_all(&ixals.to_le_bytes())?;
    writer.write_all(&ixals.to_le_bytes())?; // itab
    // Menu, description, help topic and status bar text lengths
    writer.write_all(&[0u8; 4])?;
    writer.write_all(&[kind as u8])?;
    Ok(())
}

/// BIFF5 3-D area reference to the sheet itself
fn write_biff5_area<W: Write>(
    writer: &mut W,
    sheet: u16,
    ref_type: u16,
    rows: (u16, u16),
    cols: (u8, u8),
) -> XlsResult<()> {
    writer.write_all(&[PTG_AREA_3D])?;
    writer.write_all(&(0xFFFF - sheet).to_le_bytes())?;
    writer.write_all(&[0u8; 4])?;
    writer.write_all(&0x1087u16.to_le_bytes())?;
    writer.write_all(&ref_type.to_le_bytes())?;
    writer.write_all(&sheet.to_le_bytes())?;
    writer.write_all(&sheet.to_le_bytes())?;
    writer.write_all(&rows.0.to_le_bytes())?;
    writer.write_all(&rows.1.to_le_bytes())?;
    writer.write_all(&[cols.0, cols.1])?;
    Ok(())
}

/// Write the single-area BIFF5 NAME record
///
/// Record type: 0x0018, Length: 0x24
pub fn write_name_short_biff5<W: Write>(
    writer: &mut W,
    sheet: u16,
    kind: BuiltinName,
    area: CellArea,
) -> XlsResult<()> {
    write_biff5_prefix(writer, 0x0024, 0x0015, sheet, kind)?;
    write_biff5_area(
        writer,
        sheet,
        0x8005,
        (area.first_row, area.last_row),
        (area.first_col as u8, area.last_col as u8),
    )
}

/// Write the BIFF5 NAME record holding both title rows and title columns
///
/// Record type: 0x0018, Length: 0x3D
pub fn write_name_long_biff5<W: Write>(
    writer: &mut W,
    sheet: u16,
    kind: BuiltinName,
    rows: (u16, u16),
    cols: (u16, u16),
) -> XlsResult<()> {
    write_biff5_prefix(writer, 0x003D, 0x002E, sheet, kind)?;
    writer.write_all(&[PTG_MEM_FUNC])?;
    writer.write_all(&0x002Bu16.to_le_bytes())?;
    write_biff5_area(writer, sheet, 0x8008, (0x0000, 0x3FFF), (cols.0 as u8, cols.1 as u8))?;
    write_biff5_area(writer, sheet, 0x8008, rows, (0x00, 0xFF))?;
    writer.write_all(&[PTG_UNION])?;
    Ok(())
}

/// BIFF8 `PtgArea3d` with absolute references
pub fn area3d_biff8(ixti: u16, area: CellArea) -> [u8; 11] {
    let mut out = [0u8; 11];
    out[0] = PTG_AREA_3D;
    out[1..3].copy_from_slice(&ixti.to_le_bytes());
    out[3..5].copy_from_slice(&area.first_row.to_le_bytes());
    out[5..7].copy_from_slice(&area.last_row.to_le_bytes());
    out[7..9].copy_from_slice(&area.first_col.to_le_bytes());
    out[9..11].copy_from_slice(&area.last_col.to_le_bytes());
    out
}

/// BIFF8 definition for title rows plus title columns: a union of the
/// two areas wrapped in `PtgMemFunc`
pub fn titles_rgce_biff8(ixti: u16, rows: (u16, u16), cols: (u16, u16)) -> Vec<u8> {
    let col_area = area3d_biff8(ixti, CellArea::new(0, 0xFFFF, cols.0, cols.1));
    let row_area = area3d_biff8(ixti, CellArea::new(rows.0, rows.1, 0, 0xFF));
    let inner = (col_area.len() + row_area.len() + 1) as u16;

    let mut rgce = Vec::with_capacity(3 + inner as usize);
    rgce.push(PTG_MEM_FUNC);
    rgce.extend_from_slice(&inner.to_le_bytes());
    rgce.extend_from_slice(&col_area);
    rgce.extend_from_slice(&row_area);
    rgce.push(PTG_UNION);
    rgce
}

/// Write a BIFF8 built-in NAME (Lbl) record.
///
/// Record type: 0x0018
///
/// `sheet` is the 0-based index of the owning sheet; the name is local to
/// it. `rgce` holds the definition tokens.
pub fn write_name_biff8<W: Write>(
    writer: &mut W,
    sheet: u16,
    kind: BuiltinName,
    rgce: &[u8],
) -> XlsResult<()> {
    let cce = record_len(rgce.len())?;
    write_record_header(writer, RECORD_NAME, record_len(16 + rgce.len())?)?;

    writer.write_all(&0x0020u16.to_le_bytes())?; // grbit: fBuiltin
    writer.write_all(&[0x00, 0x01])?; // chKey, cch
    writer.write_all(&cce.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // reserved
    writer.write_all(&(sheet + 1).to_le_bytes())?; // itab
    writer.write_all(&[0u8; 4])?;
    // Name: compressed flag and the built-in code
    writer.write_all(&[0x00, kind as u8])?;
    writer.write_all(rgce)?;
    Ok(())
}

/// Write the print area NAME for `sheet`
///
/// `ixti` is the XTI entry for the sheet and is only used by BIFF8.
pub fn write_print_area<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    sheet: u16,
    ixti: u16,
    area: CellArea,
) -> XlsResult<()> {
    match version {
        BiffVersion::Biff5 => write_name_short_biff5(writer, sheet, BuiltinName::PrintArea, area),
        BiffVersion::Biff8 => {
            write_name_biff8(writer, sheet, BuiltinName::PrintArea, &area3d_biff8(ixti, area))
        },
    }
}

/// Write the print titles NAME for `sheet`
///
/// Rows only cover every column and columns only cover every row. With
/// neither set nothing is written.
pub fn write_print_titles<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    sheet: u16,
    ixti: u16,
    rows: Option<(u16, u16)>,
    cols: Option<(u16, u16)>,
) -> XlsResult<()> {
    let kind = BuiltinName::PrintTitles;
    match (version, rows, cols) {
        (_, None, None) => Ok(()),
        (BiffVersion::Biff5, Some(rows), Some(cols)) => {
            write_name_long_biff5(writer, sheet, kind, rows, cols)
        },
        (BiffVersion::Biff5, Some(rows), None) => {
            write_name_short_biff5(writer, sheet, kind, CellArea::new(rows.0, rows.1, 0x00, 0xFF))
        },
        (BiffVersion::Biff5, None, Some(cols)) => write_name_short_biff5(
            writer,
            sheet,
            kind,
            CellArea::new(0x0000, 0x3FFF, cols.0, cols.1),
        ),
        (BiffVersion::Biff8, Some(rows), Some(cols)) => {
            write_name_biff8(writer, sheet, kind, &titles_rgce_biff8(ixti, rows, cols))
        },
        (BiffVersion::Biff8, Some(rows), None) => {
            let area = area3d_biff8(ixti, CellArea::new(rows.0, rows.1, 0x00, 0xFF));
            write_name_biff8(writer, sheet, kind, &area)
        },
        (BiffVersion::Biff8, None, Some(cols)) => {
            let area = area3d_biff8(ixti, CellArea::new(0x0000, 0xFFFF, cols.0, cols.1));
            write_name_biff8(writer, sheet, kind, &area)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_biff5() {
        let mut buf = Vec::new();
        write_name_short_biff5(&mut buf, 1, BuiltinName::PrintArea, CellArea::new(0, 9, 0, 3))
            .unwrap();
        assert_eq!(buf.len(), 4 + 0x24);
        assert_eq!(&buf[0..4], &[0x18, 0x00, 0x24, 0x00]);
        // ixals and itab are the 1-based sheet index
        assert_eq!(&buf[10..14], &[2, 0, 2, 0]);
        assert_eq!(buf[18], 0x06);
        assert_eq!(buf[19], 0x3B);
        assert_eq!(&buf[20..22], &(0xFFFEu16).to_le_bytes());
        assert_eq!(&buf[26..30], &[0x87, 0x10, 0x05, 0x80]);
        assert_eq!(&buf[34..40], &[0, 0, 9, 0, 0, 3]);
    }

    #[test]
    fn test_long_name_biff5() {
        let mut buf = Vec::new();
        write_name_long_biff5(&mut buf, 0, BuiltinName::PrintTitles, (0, 1), (0, 0)).unwrap();
        assert_eq!(buf.len(), 4 + 0x3D);
        assert_eq!(&buf[6..8], &[0x2E, 0x00]);
        assert_eq!(buf[18], 0x07);
        assert_eq!(&buf[19..22], &[0x29, 0x2B, 0x00]);
        assert_eq!(*buf.last().unwrap(), 0x10);
    }

    #[test]
    fn test_name_biff8_print_area() {
        let mut buf = Vec::new();
        write_print_area(&mut buf, BiffVersion::Biff8, 0, 3, CellArea::new(0, 4, 1, 2)).unwrap();
        assert_eq!(buf.len(), 4 + 16 + 11);
        assert_eq!(&buf[8..10], &[11, 0]); // cce
        assert_eq!(&buf[12..14], &[1, 0]); // itab
        assert_eq!(&buf[18..20], &[0x00, 0x06]);
        assert_eq!(&buf[20..23], &[0x3B, 3, 0]);
        assert_eq!(&buf[23..31], &[0, 0, 4, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn test_titles_rgce_biff8() {
        let rgce = titles_rgce_biff8(0, (0, 0), (0, 1));
        assert_eq!(rgce.len(), 26);
        assert_eq!(&rgce[0..3], &[0x29, 23, 0]);
        assert_eq!(rgce[3], 0x3B);
        assert_eq!(rgce[14], 0x3B);
        assert_eq!(rgce[25], 0x10);
    }

    #[test]
    fn test_titles_nothing_set() {
        let mut buf = Vec::new();
        write_print_titles(&mut buf, BiffVersion::Biff5, 0, 0, None, None).unwrap();
        assert!(buf.is_empty());
    }
}
