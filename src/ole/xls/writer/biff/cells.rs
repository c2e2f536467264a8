//! Cell records.

use crate::ole::xls::{XlsError, XlsResult};
use std::io::Write;

use super::{byte_string, record_len, write_record_header};

/// Longest BIFF5 LABEL text
pub const MAX_LABEL_LEN: usize = 255;

/// Row index as stored in cell records (0..65535)
fn row_u16(row: u32, record: &str) -> XlsResult<u16> {
    u16::try_from(row).map_err(|_| {
        XlsError::InvalidData(format!(
            "Row index {} exceeds limit 65535 for {} record",
            row, record
        ))
    })
}

fn write_cell_header<W: Write>(writer: &mut W, row: u16, col: u16, xf_index: u16) -> XlsResult<()> {
    writer.write_all(&row.to_le_bytes())?;
    writer.write_all(&col.to_le_bytes())?;
    writer.write_all(&xf_index.to_le_bytes())?;
    Ok(())
}

/// Write NUMBER record (floating point cell)
///
/// Record type: 0x0203
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `row` - Row index (0-based)
/// * `col` - Column index (0-based)
/// * `xf_index` - Cell format
/// * `value` - Cell value (f64)
pub fn write_number<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: f64,
) -> XlsResult<()> {
    let row = row_u16(row, "NUMBER")?;
    write_record_header(writer, 0x0203, 14)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write LABEL record (inline string cell, BIFF5)
///
/// Record type: 0x0204
///
/// Text is stored in the workbook code page and cut to 255 bytes.
/// Returns true when the text had to be truncated.
pub fn write_label<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: &str,
) -> XlsResult<bool> {
    let row = row_u16(row, "LABEL")?;
    let bytes = byte_string(value);
    let len = bytes.len().min(MAX_LABEL_LEN);

    write_record_header(writer, 0x0204, record_len(8 + len)?)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&(len as u16).to_le_bytes())?;
    writer.write_all(&bytes[..len])?;

    Ok(len < bytes.len())
}

/// Write LABELSST record (string cell with reference to SST)
///
/// Record type: 0x00FD
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `row` - Row index (0-based)
/// * `col` - Column index (0-based)
/// * `sst_index` - Index into shared string table
pub fn write_labelsst<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    sst_index: u32,
) -> XlsResult<()> {
    let row = row_u16(row, "LABELSST")?;
    write_record_header(writer, 0x00FD, 10)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&sst_index.to_le_bytes())?;
    Ok(())
}

/// Write BLANK record (formatted empty cell)
///
/// Record type: 0x0201
pub fn write_blank<W: Write>(writer: &mut W, row: u32, col: u16, xf_index: u16) -> XlsResult<()> {
    let row = row_u16(row, "BLANK")?;
    write_record_header(writer, 0x0201, 6)?;
    write_cell_header(writer, row, col, xf_index)?;
    Ok(())
}

/// Write FORMULA record
///
/// Record type: 0x0006
///
/// The cached result is zero and the recalculate-always and
/// calculate-on-load bits are set, so the reader evaluates the formula.
pub fn write_formula<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    rgce: &[u8],
) -> XlsResult<()> {
    let row = row_u16(row, "FORMULA")?;
    write_record_header(writer, 0x0006, record_len(22 + rgce.len())?)?;
    write_cell_header(writer, row, col, xf_index)?;

    // Cached result
    writer.write_all(&0f64.to_le_bytes())?;
    // grbit: fAlwaysCalc | fCalcOnLoad
    writer.write_all(&0x0003u16.to_le_bytes())?;
    // chn
    writer.write_all(&0u32.to_le_bytes())?;
    writer.write_all(&(rgce.len() as u16).to_le_bytes())?;
    writer.write_all(rgce)?;
    Ok(())
}

/// StdLink class identifier
const HLINK_CLSID: [u8; 16] = [
    0xD0, 0xC9, 0xEA, 0x79, 0xF9, 0xBA, 0xCE, 0x11, 0x8C, 0x82, 0x00, 0xAA, 0x00, 0x4B, 0xA9, 0x0B,
];

/// URL moniker class identifier
const URL_MONIKER: [u8; 16] = [
    0xE0, 0xC9, 0xEA, 0x79, 0xF9, 0xBA, 0xCE, 0x11, 0x8C, 0x82, 0x00, 0xAA, 0x00, 0x4B, 0xA9, 0x0B,
];

/// Write HLINK record for an external URL
///
/// Record type: 0x01B8
///
/// The link covers rows `first_row..=last_row` and columns
/// `first_col..=last_col`. The URL is stored as a null terminated UTF-16
/// string inside a URL moniker.
pub fn write_hlink_url<W: Write>(
    writer: &mut W,
    first_row: u16,
    last_row: u16,
    first_col: u16,
    last_col: u16,
    url: &str,
) -> XlsResult<()> {
    let mut url_bytes = Vec::with_capacity(url.len() * 2 + 2);
    for unit in url.encode_utf16() {
        url_bytes.extend_from_slice(&unit.to_le_bytes());
    }
    url_bytes.extend_from_slice(&[0x00, 0x00]);

    write_record_header(writer, 0x01B8, record_len(0x34 + url_bytes.len())?)?;
    writer.write_all(&first_row.to_le_bytes())?;
    writer.write_all(&last_row.to_le_bytes())?;
    writer.write_all(&first_col.to_le_bytes())?;
    writer.write_all(&last_col.to_le_bytes())?;
    writer.write_all(&HLINK_CLSID)?;
    // Stream version
    writer.write_all(&0x0000_0002u32.to_le_bytes())?;
    // hlstmfHasMoniker | hlstmfIsAbsolute
    writer.write_all(&0x0000_0003u32.to_le_bytes())?;
    writer.write_all(&URL_MONIKER)?;
    writer.write_all(&(url_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&url_bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_record() {
        let mut buf = Vec::new();
        write_number(&mut buf, 2, 3, 15, 1.5).unwrap();
        assert_eq!(buf.len(), 18);
        assert_eq!(&buf[0..4], &[0x03, 0x02, 14, 0]);
        assert_eq!(&buf[4..10], &[2, 0, 3, 0, 15, 0]);
        assert_eq!(&buf[10..18], &1.5f64.to_le_bytes());
    }

    #[test]
    fn test_row_out_of_range() {
        let mut buf = Vec::new();
        assert!(write_number(&mut buf, 70_000, 0, 15, 1.0).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_label_truncates() {
        let mut buf = Vec::new();
        let truncated = write_label(&mut buf, 0, 0, 15, &"x".repeat(300)).unwrap();
        assert!(truncated);
        assert_eq!(buf.len(), 4 + 8 + 255);
        assert_eq!(&buf[10..12], &[255, 0]);

        let mut buf = Vec::new();
        assert!(!write_label(&mut buf, 0, 0, 15, "Hi").unwrap());
        assert_eq!(buf, [0x04, 0x02, 10, 0, 0, 0, 0, 0, 15, 0, 2, 0, b'H', b'i']);
    }

    #[test]
    fn test_formula_record() {
        let rgce = [0x1E, 0x01, 0x00];
        let mut buf = Vec::new();
        write_formula(&mut buf, 0, 1, 15, &rgce).unwrap();
        assert_eq!(&buf[0..4], &[0x06, 0x00, 25, 0]);
        assert_eq!(&buf[18..20], &[0x03, 0x00]);
        assert_eq!(&buf[24..26], &[3, 0]);
        assert_eq!(&buf[26..], &rgce);
    }

    #[test]
    fn test_hlink_length() {
        let mut buf = Vec::new();
        write_hlink_url(&mut buf, 1, 1, 2, 2, "http://a.b").unwrap();
        let url_bytes = (10 + 1) * 2;
        assert_eq!(buf.len(), 4 + 0x34 + url_bytes);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]) as usize, 0x34 + url_bytes);
        assert_eq!(&buf[4..12], &[1, 0, 1, 0, 2, 0, 2, 0]);
        assert_eq!(&buf[12..28], &HLINK_CLSID);
        assert_eq!(&buf[36..52], &URL_MONIKER);
        assert_eq!(&buf[52..56], &(url_bytes as u32).to_le_bytes());
    }
}
