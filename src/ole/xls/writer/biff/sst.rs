//! Shared String Table (SST) BIFF8 writer.
//!
//! The string data is cut into blocks of at most [`SST_BLOCK_LIMIT`]
//! bytes. The first block is the SST record body (after the two counts);
//! every other block becomes a CONTINUE record. A string header is never
//! split from its first character. When a string's characters run into
//! the next block, that block starts with a repeat of the string's
//! encoding flag, and UTF-16 data is only cut on character boundaries.
//!
//! The workbook encodes the table once, before the sheet offsets are
//! fixed, and appends those exact bytes to the globals.

use std::io::Write;

use crate::ole::xls::{XlsError, XlsResult};

use super::{RECORD_CONTINUE, biff8_char_count, biff8_chars, record_len, write_record_header};

/// Largest number of string bytes per SST or CONTINUE record
pub const SST_BLOCK_LIMIT: usize = 8208;

/// Cut the encoded strings into record-sized blocks
pub fn layout<S: AsRef<str>>(strings: &[S]) -> XlsResult<Vec<Vec<u8>>> {
    let mut blocks: Vec<Vec<u8>> = vec![Vec::new()];

    for s in strings {
        let s = s.as_ref();
        let (flag, chars) = biff8_chars(s);
        let cch = u16::try_from(biff8_char_count(s)).map_err(|_| {
            XlsError::InvalidData(format!(
                "shared string of {} characters does not fit the SST",
                biff8_char_count(s)
            ))
        })?;
        let unit = if flag == 0x01 { 2 } else { 1 };
        let chars = chars.as_slice();

        // Header plus the first character must share a block
        let needed = 3 + if chars.is_empty() { 0 } else { unit };
        if SST_BLOCK_LIMIT - current(&blocks).len() < needed {
            blocks.push(Vec::new());
        }

        let block = current_mut(&mut blocks);
        block.extend_from_slice(&cch.to_le_bytes());
        block.push(flag);

        let mut rest = chars;
        loop {
            let block = current_mut(&mut blocks);
            let room = SST_BLOCK_LIMIT - block.len();
            let mut take = room.min(rest.len());
            if unit == 2 {
                take -= take % 2;
            }
            block.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if rest.is_empty() {
                break;
            }
            blocks.push(vec![flag]);
        }
    }

    Ok(blocks)
}

fn current(blocks: &[Vec<u8>]) -> &Vec<u8> {
    &blocks[blocks.len() - 1]
}

fn current_mut(blocks: &mut [Vec<u8>]) -> &mut Vec<u8> {
    let last = blocks.len() - 1;
    &mut blocks[last]
}

/// Total size in bytes of the SST record and its CONTINUE records
#[cfg(test)]
pub fn sst_size<S: AsRef<str>>(strings: &[S]) -> usize {
    let blocks = layout(strings).unwrap();
    // SST header, the two counts, then 4 bytes per CONTINUE header
    blocks.iter().map(|block| block.len() + 4).sum::<usize>() + 8
}

/// Write SST (Shared String Table) record with CONTINUE records
///
/// Record type: 0x00FC
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `strings` - Unique strings in index order
/// * `cst_total` - Number of string cells in the workbook
pub fn write_sst<W: Write, S: AsRef<str>>(
    writer: &mut W,
    strings: &[S],
    cst_total: u32,
) -> XlsResult<()> {
    let blocks = layout(strings)?;
    let mut blocks = blocks.iter();

    let first: &[u8] = blocks.next().map(Vec::as_slice).unwrap_or(&[]);
    write_record_header(writer, 0x00FC, record_len(8 + first.len())?)?;
    writer.write_all(&cst_total.to_le_bytes())?;
    writer.write_all(&(strings.len() as u32).to_le_bytes())?;
    writer.write_all(first)?;

    for block in blocks {
        write_record_header(writer, RECORD_CONTINUE, record_len(block.len())?)?;
        writer.write_all(block)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the physical records and return (type, body) pairs
    fn physical_records(data: &[u8]) -> Vec<(u16, Vec<u8>)> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let record_type = u16::from_le_bytes([data[pos], data[pos + 1]]);
            let len = u16::from_le_bytes([data[pos + 2], data[pos + 3]]) as usize;
            out.push((record_type, data[pos + 4..pos + 4 + len].to_vec()));
            pos += 4 + len;
        }
        out
    }

    #[test]
    fn test_empty_sst() {
        let strings: [&str; 0] = [];
        let mut buf = Vec::new();
        write_sst(&mut buf, &strings, 0).unwrap();
        assert_eq!(buf, [0xFC, 0x00, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(sst_size(&strings), 12);
    }

    #[test]
    fn test_small_table() {
        let strings = ["Hello", "World"];
        let mut buf = Vec::new();
        write_sst(&mut buf, &strings, 3).unwrap();
        assert_eq!(buf.len(), sst_size(&strings));
        assert_eq!(&buf[4..12], &[3, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&buf[12..20], &[5, 0, 0, b'H', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_long_string_continues_with_flag() {
        let long = "a".repeat(10_000);
        let strings = [long.as_str()];
        let mut buf = Vec::new();
        write_sst(&mut buf, &strings, 1).unwrap();
        assert_eq!(buf.len(), sst_size(&strings));

        let records = physical_records(&buf);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 0x00FC);
        assert_eq!(records[0].1.len(), 8 + SST_BLOCK_LIMIT);
        assert_eq!(records[1].0, RECORD_CONTINUE);
        assert_eq!(records[1].1[0], 0x00);
        // 3 header bytes and 8205 characters fit in the first block
        assert_eq!(records[1].1.len(), 1 + 10_000 - 8205);
    }

    #[test]
    fn test_wide_string_splits_on_char_boundary() {
        let long = "\u{4e2d}".repeat(5_000);
        let blocks = layout(&[long.as_str()]).unwrap();
        assert_eq!(blocks.len(), 2);
        // 3 header bytes leave an odd amount of room; the data part is even
        assert_eq!((blocks[0].len() - 3) % 2, 0);
        assert_eq!(blocks[1][0], 0x01);
        assert_eq!((blocks[1].len() - 1) % 2, 0);
        assert_eq!(blocks[0].len() - 3 + blocks[1].len() - 1, 10_000);
    }

    #[test]
    fn test_header_never_split() {
        // Fill the first block so only two bytes remain
        let filler = "b".repeat(SST_BLOCK_LIMIT - 3 - 2);
        let strings = [filler.as_str(), "xyz"];
        let blocks = layout(&strings).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), SST_BLOCK_LIMIT - 2);
        assert_eq!(blocks[1], [3, 0, 0, b'x', b'y', b'z']);
    }

    #[test]
    fn test_oversized_string_is_an_error() {
        let long = "a".repeat(70_000);
        assert!(matches!(
            layout(&[long.as_str()]),
            Err(XlsError::InvalidData(_))
        ));
        let mut buf = Vec::new();
        assert!(write_sst(&mut buf, &[long.as_str()], 1).is_err());
    }
}
