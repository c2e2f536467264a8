//! Workbook-level tests for the record writer

use std::io::{Cursor, Read};

use super::*;
use crate::ole::xls::{FormulaError, XlsError};

/// Physical records of a BIFF stream as (type, body)
fn records(stream: &[u8]) -> Vec<(u16, &[u8])> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 4 <= stream.len() {
        let record_type = u16::from_le_bytes([stream[pos], stream[pos + 1]]);
        let len = u16::from_le_bytes([stream[pos + 2], stream[pos + 3]]) as usize;
        out.push((record_type, &stream[pos + 4..pos + 4 + len]));
        pos += 4 + len;
    }
    out
}

fn count(stream: &[u8], record_type: u16) -> usize {
    records(stream)
        .iter()
        .filter(|(t, _)| *t == record_type)
        .count()
}

/// Extract the BIFF stream from a closed workbook
fn biff_stream(workbook: &mut Workbook) -> Vec<u8> {
    let name = workbook.version().stream_name();
    let bytes = workbook.to_bytes().unwrap();
    let mut file = cfb::CompoundFile::open(Cursor::new(bytes)).unwrap();
    let mut stream = file.open_stream(format!("/{}", name)).unwrap();
    let mut data = Vec::new();
    stream.read_to_end(&mut data).unwrap();
    data
}

/// Globals substream only (up to and including the first EOF)
fn globals(stream: &[u8]) -> &[u8] {
    let mut pos = 0;
    while pos + 4 <= stream.len() {
        let record_type = u16::from_le_bytes([stream[pos], stream[pos + 1]]);
        let len = u16::from_le_bytes([stream[pos + 2], stream[pos + 3]]) as usize;
        pos += 4 + len;
        if record_type == 0x000A {
            break;
        }
    }
    &stream[..pos]
}

fn boundsheet_offsets(stream: &[u8]) -> Vec<usize> {
    records(globals(stream))
        .iter()
        .filter(|(t, _)| *t == 0x0085)
        .map(|(_, body)| u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize)
        .collect()
}

fn assert_offsets_point_at_bof(stream: &[u8]) {
    for offset in boundsheet_offsets(stream) {
        assert_eq!(&stream[offset..offset + 2], &[0x09, 0x08]);
        // Worksheet substream type
        assert_eq!(&stream[offset + 6..offset + 8], &[0x10, 0x00]);
    }
}

#[test]
fn test_boundsheet_offsets_two_sheets() {
    let mut workbook = Workbook::new().unwrap();
    let first = workbook.add_worksheet("First").unwrap();
    let second = workbook.add_worksheet("Second").unwrap();
    for row in 0..50 {
        workbook
            .write_string(first, row, 0, &format!("row {}", row), None)
            .unwrap();
        workbook
            .write_number(second, row, 1, f64::from(row), None)
            .unwrap();
    }

    let stream = biff_stream(&mut workbook);
    let offsets = boundsheet_offsets(&stream);
    assert_eq!(offsets.len(), 2);
    assert_eq!(offsets[0], globals(&stream).len());
    assert_offsets_point_at_bof(&stream);
}

#[test]
fn test_offsets_with_large_shared_string_table() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Strings").unwrap();
    workbook.add_worksheet("After").unwrap();
    workbook.set_country(1).unwrap();
    for row in 0..3000 {
        workbook
            .write_string(sheet, row, 0, &format!("distinct value {:05}", row), None)
            .unwrap();
    }

    let stream = biff_stream(&mut workbook);
    assert!(count(globals(&stream), 0x003C) > 0);
    assert_eq!(count(globals(&stream), 0x008C), 1);
    assert_offsets_point_at_bof(&stream);
}

#[test]
fn test_font_and_xf_dedup() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("").unwrap();
    let props = FormatProperties {
        bold: true,
        ..Default::default()
    };
    let a = workbook.add_format(props.clone()).unwrap();
    let b = workbook.add_format(props).unwrap();
    workbook.write_number(sheet, 0, 0, 1.0, Some(a)).unwrap();
    workbook.write_number(sheet, 1, 0, 2.0, Some(b)).unwrap();

    let stream = biff_stream(&mut workbook);
    let globals = globals(&stream);
    // Default font x5, link font, shared bold font
    assert_eq!(count(globals, 0x0031), 7);
    // 16 built-in XFs, the link format and both user formats
    assert_eq!(count(globals, 0x00E0), 19);
    assert_eq!(
        workbook.format(a).unwrap().font_index(),
        workbook.format(b).unwrap().font_index()
    );
}

#[test]
fn test_number_format_dedup() {
    let mut workbook = Workbook::new().unwrap();
    workbook.add_worksheet("Sheet1").unwrap();
    for _ in 0..2 {
        workbook
            .add_format(FormatProperties {
                num_format: Some("#,##0.000".into()),
                ..Default::default()
            })
            .unwrap();
    }
    workbook
        .add_format(FormatProperties {
            num_format: Some("14".into()),
            ..Default::default()
        })
        .unwrap();

    let stream = biff_stream(&mut workbook);
    let formats: Vec<_> = records(globals(&stream))
        .into_iter()
        .filter(|(t, _)| *t == 0x041E)
        .collect();
    assert_eq!(formats.len(), 1);
    assert_eq!(&formats[0].1[0..2], &164u16.to_le_bytes());
}

#[test]
fn test_default_sheet_name_and_errors() {
    let mut workbook = Workbook::new().unwrap();
    assert_eq!(workbook.add_worksheet("").unwrap(), 0);
    assert_eq!(workbook.worksheet_names(), ["Sheet1"]);
    assert_eq!(workbook.sheet_index("Sheet1"), Some(0));

    assert!(matches!(
        workbook.add_worksheet("Sheet1"),
        Err(XlsError::DuplicateSheetName { .. })
    ));
    let long = "x".repeat(32);
    assert!(matches!(
        workbook.add_worksheet(&long),
        Err(XlsError::SheetNameTooLong { .. })
    ));
    assert!(matches!(
        workbook.write_number(3, 0, 0, 1.0, None),
        Err(XlsError::WorksheetNotFound(3))
    ));
    assert!(matches!(
        workbook.write_number(0, 0, 0, 1.0, Some(99)),
        Err(XlsError::FormatNotFound(99))
    ));
}

#[test]
fn test_closed_workbook_rejects_writes() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    workbook.write_number(sheet, 0, 0, 1.0, None).unwrap();
    workbook.close().unwrap();
    let first = workbook.to_bytes().unwrap();

    // A second close changes nothing
    workbook.close().unwrap();
    assert_eq!(workbook.to_bytes().unwrap(), first);

    assert!(matches!(
        workbook.write_number(sheet, 1, 0, 2.0, None),
        Err(XlsError::WorkbookClosed)
    ));
    assert!(matches!(
        workbook.add_worksheet("More"),
        Err(XlsError::WorkbookClosed)
    ));
    assert!(matches!(
        workbook.add_format(FormatProperties::default()),
        Err(XlsError::WorkbookClosed)
    ));
}

#[test]
fn test_custom_color_validation() {
    let mut workbook = Workbook::new().unwrap();
    assert_eq!(workbook.set_custom_color(40, 0x12, 0x34, 0x56).unwrap(), 40);
    assert!(matches!(
        workbook.set_custom_color(65, 0, 0, 0),
        Err(XlsError::ColorIndexOutOfRange(65))
    ));
    assert!(matches!(
        workbook.set_custom_color(8, 0, 0, 300),
        Err(XlsError::ColorComponentOutOfRange { component: 'b', value: 300 })
    ));

    workbook.add_worksheet("Sheet1").unwrap();
    let stream = biff_stream(&mut workbook);
    let palette = records(globals(&stream))
        .into_iter()
        .find(|(t, _)| *t == 0x0092)
        .map(|(_, body)| body.to_vec())
        .unwrap();
    assert_eq!(&palette[0..2], &56u16.to_le_bytes());
    let entry = 2 + (40 - 8) * 4;
    assert_eq!(&palette[entry..entry + 4], &[0x12, 0x34, 0x56, 0x00]);
}

#[test]
fn test_formula_with_unknown_sheet_is_rejected() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Sheet1").unwrap();
    let err = workbook
        .write_formula(sheet, 0, 0, "=Missing!A1", None)
        .unwrap_err();
    assert!(matches!(
        err,
        XlsError::Formula(FormulaError::UnknownSheet(ref name)) if name == "Missing"
    ));
    assert!(matches!(
        workbook.write_formula(sheet, 0, 256, "1+1", None),
        Err(XlsError::CellOutOfRange { row: 0, col: 256 })
    ));
}

#[test]
fn test_auto_dispatch() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Mixed").unwrap();
    workbook.write(sheet, 0, 0, 1.5, None).unwrap();
    workbook.write(sheet, 1, 0, "-2.5e3", None).unwrap();
    workbook.write(sheet, 2, 0, "=A1*2", None).unwrap();
    workbook.write(sheet, 3, 0, "text", None).unwrap();
    workbook.write(sheet, 4, 0, "http://example.com", None).unwrap();
    // No format, so no record
    workbook.write(sheet, 5, 0, "", None).unwrap();
    workbook.write(sheet, 6, 0, CellValue::Blank, Some(0)).unwrap();

    let stream = biff_stream(&mut workbook);
    let sheet_data = &stream[boundsheet_offsets(&stream)[0]..];
    assert_eq!(count(sheet_data, 0x0203), 2);
    assert_eq!(count(sheet_data, 0x0006), 1);
    assert_eq!(count(sheet_data, 0x00FD), 2);
    assert_eq!(count(sheet_data, 0x01B8), 1);
    assert_eq!(count(sheet_data, 0x0201), 1);
}

#[test]
fn test_print_titles_register_extern_sheets() {
    let mut workbook = Workbook::new().unwrap();
    workbook.add_worksheet("One").unwrap();
    let two = workbook.add_worksheet("Two").unwrap();
    workbook.repeat_rows(two, 0, 1).unwrap();
    workbook.print_area(two, 0, 0, 20, 5).unwrap();

    let stream = biff_stream(&mut workbook);
    let globals = globals(&stream);
    assert_eq!(count(globals, 0x01AE), 1);
    assert_eq!(count(globals, 0x0017), 1);
    assert_eq!(count(globals, 0x0018), 2);
    assert_offsets_point_at_bof(&stream);
}

#[test]
fn test_biff5_workbook() {
    let mut workbook = Workbook::with_options(WorkbookOptions {
        version: BiffVersion::Biff5,
        ..Default::default()
    })
    .unwrap();
    let sheet = workbook.add_worksheet("Old").unwrap();
    workbook.add_worksheet("Older").unwrap();
    workbook.write_string(sheet, 0, 0, "label", None).unwrap();
    workbook.write_formula(sheet, 1, 0, "Older!A1+1", None).unwrap();
    workbook.repeat_columns(sheet, 0, 0).unwrap();

    let stream = biff_stream(&mut workbook);
    let globals = globals(&stream);
    assert_eq!(&records(globals)[0].1[0..2], &0x0500u16.to_le_bytes());
    assert_eq!(count(globals, 0x0016), 1);
    assert_eq!(count(globals, 0x0017), 2);
    assert_eq!(count(globals, 0x0018), 1);
    assert_eq!(count(globals, 0x00FC), 0);
    assert_eq!(count(&stream, 0x0204), 1);
    assert_offsets_point_at_bof(&stream);
}

#[test]
fn test_selected_and_active_sheets() {
    let mut workbook = Workbook::new().unwrap();
    workbook.add_worksheet("A").unwrap();
    let b = workbook.add_worksheet("B").unwrap();
    workbook.activate(b).unwrap();
    workbook.set_first_sheet(b).unwrap();

    let stream = biff_stream(&mut workbook);
    let window1 = records(globals(&stream))
        .into_iter()
        .find(|(t, _)| *t == 0x003D)
        .map(|(_, body)| body.to_vec())
        .unwrap();
    assert_eq!(&window1[10..12], &1u16.to_le_bytes());
    assert_eq!(&window1[12..14], &1u16.to_le_bytes());
    assert_eq!(&window1[14..16], &1u16.to_le_bytes());
}

/// Body of the first `record_type` record at or after `offset`
fn first_body(stream: &[u8], offset: usize, record_type: u16) -> Vec<u8> {
    records(&stream[offset..])
        .into_iter()
        .find(|(t, _)| *t == record_type)
        .map(|(_, body)| body.to_vec())
        .unwrap()
}

#[test]
fn test_page_setup_and_view_options() {
    let mut workbook = Workbook::new().unwrap();
    let a = workbook.add_worksheet("A").unwrap();
    let b = workbook.add_worksheet("B").unwrap();
    workbook.set_1904(true).unwrap();
    workbook.select(b).unwrap();
    workbook.set_landscape(a).unwrap();
    workbook.set_paper(a, 9).unwrap();
    workbook.set_portrait(b).unwrap();
    workbook.set_zoom(b, 150).unwrap();
    assert!(workbook.set_zoom(b, 401).is_err());

    let stream = biff_stream(&mut workbook);
    assert_eq!(first_body(&stream, 0, 0x0022), [1, 0]);
    // Both tabs selected, the first one active
    let window1 = first_body(&stream, 0, 0x003D);
    assert_eq!(&window1[10..12], &0u16.to_le_bytes());
    assert_eq!(&window1[14..16], &2u16.to_le_bytes());

    let offsets = boundsheet_offsets(&stream);
    let setup_a = first_body(&stream, offsets[0], 0x00A1);
    assert_eq!(&setup_a[0..2], &9u16.to_le_bytes());
    assert_eq!(&setup_a[10..12], &0u16.to_le_bytes());
    let setup_b = first_body(&stream, offsets[1], 0x00A1);
    assert_eq!(&setup_b[0..2], &0u16.to_le_bytes());
    assert_eq!(&setup_b[10..12], &2u16.to_le_bytes());

    let window2_a = first_body(&stream, offsets[0], 0x023E);
    let window2_b = first_body(&stream, offsets[1], 0x023E);
    let grbit_a = u16::from_le_bytes([window2_a[0], window2_a[1]]);
    let grbit_b = u16::from_le_bytes([window2_b[0], window2_b[1]]);
    assert_eq!(grbit_a & 0x0600, 0x0600);
    assert_ne!(grbit_b & 0x0200, 0);
    assert_eq!(grbit_b & 0x0400, 0);
    assert_eq!(first_body(&stream, offsets[1], 0x00A0), [150, 0, 100, 0]);
}

#[test]
fn test_overlong_cell_text_is_rejected() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Text").unwrap();
    let err = workbook
        .write_string(sheet, 3, 1, &"a".repeat(70_000), None)
        .unwrap_err();
    assert!(matches!(
        err,
        XlsError::StringTooLong {
            row: 3,
            col: 1,
            len: 70_000,
            max: 32_767
        }
    ));

    // The limit counts UTF-16 units
    let pairs = "\u{1F600}".repeat(16_384);
    assert!(matches!(
        workbook.write_string(sheet, 0, 0, &pairs, None),
        Err(XlsError::StringTooLong { len: 32_768, .. })
    ));

    workbook
        .write_string(sheet, 0, 0, &"b".repeat(32_767), None)
        .unwrap();
    let stream = biff_stream(&mut workbook);
    assert_eq!(count(&stream, 0x00FD), 1);
}

#[test]
fn test_formula_string_outside_basic_plane() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Emoji").unwrap();
    workbook
        .write_formula(sheet, 0, 0, "=\"\u{1F600}\"&\"x\"", None)
        .unwrap();
    let stream = biff_stream(&mut workbook);
    let (_, body) = records(&stream)
        .into_iter()
        .find(|(t, _)| *t == 0x0006)
        .unwrap();
    let cce = u16::from_le_bytes([body[20], body[21]]) as usize;
    assert_eq!(
        &body[22..22 + cce],
        &[0x17, 2, 0x01, 0x3D, 0xD8, 0x00, 0xDE, 0x17, 1, 0x00, b'x', 0x08]
    );
}
