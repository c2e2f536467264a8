//! Workbook globals and final stream assembly.
//!
//! The BOUNDSHEET records in the globals carry the absolute offset of
//! every worksheet BOF, so the size of everything that follows them must
//! be known first. The records after BOUNDSHEET (COUNTRY, the BIFF8 XTI
//! table and NAMEs, the SST) are encoded into scratch buffers up front;
//! their sizes plus the BOUNDSHEET sizes give the offset of the first
//! sheet, and the sheets follow in registration order.

use log::debug;

use crate::ole::xls::writer::biff::named_range::{write_print_area, write_print_titles};
use crate::ole::xls::writer::biff::sst::write_sst;
use crate::ole::xls::writer::biff::workbook::{
    boundsheet_size, write_bof, write_boundsheet, write_codepage, write_country, write_datemode,
    write_eof, write_externcount, write_externsheet_biff5, write_externsheet_biff8, write_palette,
    write_style, write_supbook_internal, write_window1,
};
use crate::ole::xls::writer::biff::{BiffVersion, SUBSTREAM_GLOBALS};
use crate::ole::xls::writer::byte_stream::ByteStream;
use crate::ole::xls::writer::formatting::{FormattingManager, Palette};
use crate::ole::xls::writer::formula::ExternSheets;
use crate::ole::xls::{XlsError, XlsResult};

use super::shared_strings::SharedStrings;
use super::worksheet::Worksheet;

/// Workbook-level settings written to the globals substream
pub(crate) struct Globals<'a> {
    pub version: BiffVersion,
    pub codepage: u16,
    pub date_1904: bool,
    pub active: u16,
    pub first_tab: u16,
    pub selected: u16,
    pub country: Option<u16>,
    pub palette: &'a Palette,
    pub strings: &'a SharedStrings,
}

/// Print area and print title NAMEs for every sheet.
///
/// BIFF8 names point into the XTI table, so entries are registered in
/// `externs` as a side effect.
fn write_names(
    stream: &mut ByteStream,
    version: BiffVersion,
    sheets: &[Worksheet],
    externs: &mut ExternSheets,
) -> XlsResult<()> {
    for (index, sheet) in sheets.iter().enumerate() {
        let index = index as u16;
        let needs_name = sheet.print_area.is_some()
            || sheet.title_rows.is_some()
            || sheet.title_cols.is_some();
        if !needs_name {
            continue;
        }
        let ixti = match version {
            BiffVersion::Biff5 => 0,
            BiffVersion::Biff8 => externs.index_of(index, index),
        };

        if let Some(area) = sheet.print_area {
            stream.record(|buf| write_print_area(buf, version, index, ixti, area))?;
        }
        stream.record(|buf| {
            write_print_titles(
                buf,
                version,
                index,
                ixti,
                sheet.title_rows,
                sheet.title_cols,
            )
        })?;
    }
    Ok(())
}

/// Build the complete workbook stream: globals followed by every sheet
pub(crate) fn generate_workbook_stream(
    globals: &Globals<'_>,
    fmt: &mut FormattingManager,
    externs: &mut ExternSheets,
    sheets: &[Worksheet],
    bodies: &[ByteStream],
) -> XlsResult<Vec<u8>> {
    let version = globals.version;
    let mut stream = ByteStream::new(version);

    stream.record(|buf| write_bof(buf, version, SUBSTREAM_GLOBALS))?;
    stream.record(|buf| write_codepage(buf, globals.codepage))?;

    match version {
        BiffVersion::Biff5 => {
            stream.record(|buf| write_externcount(buf, sheets.len() as u16))?;
            for sheet in sheets {
                stream.record(|buf| write_externsheet_biff5(buf, Some(sheet.name.as_str())))?;
            }
            write_names(&mut stream, version, sheets, externs)?;
            stream.record(|buf| {
                write_window1(buf, globals.active, globals.first_tab, globals.selected)
            })?;
        },
        BiffVersion::Biff8 => {
            stream.record(|buf| {
                write_window1(buf, globals.active, globals.first_tab, globals.selected)
            })?;
        },
    }

    stream.record(|buf| write_datemode(buf, globals.date_1904))?;
    // One record each, all within the limit
    let mut formatting = Vec::new();
    fmt.write_fonts(&mut formatting)?;
    fmt.write_number_formats(&mut formatting)?;
    fmt.write_xfs(&mut formatting)?;
    stream.append_framed(&formatting);
    stream.record(write_style)?;
    stream.record(|buf| write_palette(buf, globals.palette.colors()))?;

    // Everything after the BOUNDSHEET records, encoded ahead of time
    let mut tail = ByteStream::new(version);
    if let Some(code) = globals.country {
        tail.record(|buf| write_country(buf, code))?;
    }
    if version == BiffVersion::Biff8 {
        let mut names = ByteStream::new(version);
        write_names(&mut names, version, sheets, externs)?;
        if !externs.is_empty() {
            tail.record(|buf| write_supbook_internal(buf, sheets.len() as u16))?;
            tail.record(|buf| write_externsheet_biff8(buf, externs.entries()))?;
        }
        tail.append_framed(names.as_slice());

        let mut sst = Vec::new();
        write_sst(&mut sst, globals.strings.strings(), globals.strings.total())?;
        debug!(
            "SST: {} unique of {} strings, {} bytes",
            globals.strings.unique(),
            globals.strings.total(),
            sst.len()
        );
        tail.append_framed(&sst);
    }

    let boundsheets: usize = sheets
        .iter()
        .map(|sheet| boundsheet_size(version, &sheet.name))
        .sum();
    let first_offset = stream.len() + boundsheets + tail.len() + 4;

    let mut offsets = Vec::with_capacity(bodies.len());
    let mut offset = first_offset;
    for body in bodies {
        offsets.push(offset_u32(offset)?);
        offset += body.len();
    }

    for (sheet, &position) in sheets.iter().zip(&offsets) {
        stream.record(|buf| write_boundsheet(buf, version, position, &sheet.name))?;
    }
    stream.append_framed(tail.as_slice());
    stream.record(write_eof)?;

    if stream.len() != first_offset {
        return Err(XlsError::InvalidData(format!(
            "Workbook globals are {} bytes, expected {}",
            stream.len(),
            first_offset
        )));
    }
    debug!("worksheet offsets: {:?}", offsets);

    let mut out = stream.into_vec();
    out.reserve(offset - out.len());
    for body in bodies {
        out.extend_from_slice(body.as_slice());
    }
    Ok(out)
}

fn offset_u32(offset: usize) -> XlsResult<u32> {
    u32::try_from(offset).map_err(|_| {
        XlsError::InvalidData(format!("Worksheet offset {} exceeds 4 GiB", offset))
    })
}
