use std::io::{Cursor, Read};

use calamine::{Data, Reader, Xls, open_workbook};
use longan::{BiffVersion, FormatProperties, Workbook, WorkbookOptions, XlsError};

const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

fn workbook_stream(bytes: Vec<u8>, name: &str) -> Vec<u8> {
    let mut file = cfb::CompoundFile::open(Cursor::new(bytes)).expect("open compound file");
    let mut stream = file.open_stream(format!("/{name}")).expect("open stream");
    let mut data = Vec::new();
    stream.read_to_end(&mut data).expect("read stream");
    data
}

fn boundsheet_offsets(stream: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 0;
    while pos + 4 <= stream.len() {
        let record_type = u16::from_le_bytes([stream[pos], stream[pos + 1]]);
        let len = u16::from_le_bytes([stream[pos + 2], stream[pos + 3]]) as usize;
        let body = &stream[pos + 4..pos + 4 + len];
        if record_type == 0x0085 {
            offsets.push(u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize);
        }
        pos += 4 + len;
        if record_type == 0x000A {
            break;
        }
    }
    offsets
}

#[test]
fn string_number_and_formula_read_back() {
    let tmp = tempfile::NamedTempFile::new().expect("temp file");

    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Sheet1").unwrap();
    workbook.write_string(sheet, 0, 0, "Hello", None).unwrap();
    workbook.write_number(sheet, 1, 0, 42.0, None).unwrap();
    workbook
        .write_formula(sheet, 2, 0, "=SUM(A1:A2)", None)
        .unwrap();
    workbook.save(tmp.path()).unwrap();

    let bytes = std::fs::read(tmp.path()).unwrap();
    assert_eq!(&bytes[..8], &SIGNATURE);

    let mut xls: Xls<_> = open_workbook(tmp.path()).expect("open workbook via calamine");
    assert_eq!(xls.sheet_names(), vec!["Sheet1".to_string()]);

    let range = xls.worksheet_range("Sheet1").expect("read sheet");
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("Hello".to_string())));
    assert_eq!(range.get_value((1, 0)), Some(&Data::Float(42.0)));

    let formulas = xls.worksheet_formula("Sheet1").expect("read formulas");
    let formula = formulas.get_value((2, 0)).expect("formula cell");
    assert!(formula.contains("SUM"), "unexpected formula {formula:?}");
    assert!(formula.contains("A1:A2"), "unexpected formula {formula:?}");
}

#[test]
fn formatted_cells_and_multiple_sheets_read_back() {
    let tmp = tempfile::NamedTempFile::new().expect("temp file");

    let mut workbook = Workbook::create(tmp.path()).unwrap();
    let summary = workbook.add_worksheet("Summary").unwrap();
    let detail = workbook.add_worksheet("Detail").unwrap();
    let money = workbook
        .add_format(FormatProperties {
            num_format: Some("#,##0.00".into()),
            bold: true,
            ..Default::default()
        })
        .unwrap();

    workbook.set_column(detail, 0, 1, Some(20.0), None, false).unwrap();
    workbook.freeze_panes(detail, 1, 0).unwrap();
    workbook.write(detail, 0, 0, "Item", None).unwrap();
    workbook.write(detail, 0, 1, "Cost", None).unwrap();
    for row in 1..=20u32 {
        workbook
            .write(detail, row, 0, format!("item {row}"), None)
            .unwrap();
        workbook
            .write_number(detail, row, 1, f64::from(row) * 1.5, Some(money))
            .unwrap();
    }
    workbook
        .write_formula(summary, 0, 0, "SUM(Detail!B2:B21)", Some(money))
        .unwrap();
    workbook.close().unwrap();

    let mut xls: Xls<_> = open_workbook(tmp.path()).expect("open workbook via calamine");
    assert_eq!(
        xls.sheet_names(),
        vec!["Summary".to_string(), "Detail".to_string()]
    );
    let range = xls.worksheet_range("Detail").expect("read sheet");
    assert_eq!(range.get_value((5, 0)), Some(&Data::String("item 5".to_string())));
    assert_eq!(range.get_value((20, 1)), Some(&Data::Float(30.0)));
}

#[test]
fn unknown_sheet_in_formula_is_an_error() {
    let mut workbook = Workbook::new().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    let result = workbook.write_formula(sheet, 0, 0, "=Other!A1*2", None);
    assert!(matches!(result, Err(XlsError::Formula(_))));

    workbook.add_worksheet("Other").unwrap();
    assert!(workbook.write_formula(sheet, 0, 0, "=Other!A1*2", None).is_ok());
}

#[test]
fn pagination_starts_new_sheet_with_consistent_offsets() {
    const ROWS_PER_SHEET: u32 = 1000;
    const TOTAL_ROWS: u32 = 1500;

    let mut workbook = Workbook::new().unwrap();
    let mut sheet = workbook.add_worksheet("").unwrap();
    let mut row_in_sheet = 0;
    for n in 0..TOTAL_ROWS {
        if row_in_sheet == ROWS_PER_SHEET {
            sheet = workbook.add_worksheet("").unwrap();
            row_in_sheet = 0;
        }
        workbook
            .write_string(sheet, row_in_sheet, 0, &format!("record {n}"), None)
            .unwrap();
        workbook
            .write_number(sheet, row_in_sheet, 1, f64::from(n), None)
            .unwrap();
        row_in_sheet += 1;
    }
    assert_eq!(workbook.worksheet_names(), ["Sheet1", "Sheet2"]);

    let stream = workbook_stream(workbook.to_bytes().unwrap(), "Workbook");
    let offsets = boundsheet_offsets(&stream);
    assert_eq!(offsets.len(), 2);
    assert!(offsets[0] < offsets[1]);
    for offset in &offsets {
        assert_eq!(&stream[*offset..*offset + 2], &[0x09, 0x08]);
    }
    // The first sheet ends right before the second one starts
    assert_eq!(&stream[offsets[1] - 4..offsets[1]], &[0x0A, 0x00, 0x00, 0x00]);

    let tmp = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(tmp.path(), workbook.to_bytes().unwrap()).unwrap();
    let mut xls: Xls<_> = open_workbook(tmp.path()).expect("open workbook via calamine");
    let second = xls.worksheet_range("Sheet2").expect("read sheet");
    assert_eq!(second.get_value((0, 1)), Some(&Data::Float(1000.0)));
    assert_eq!(
        second.get_value((499, 0)),
        Some(&Data::String("record 1499".to_string()))
    );
}

#[test]
fn biff5_workbook_uses_book_stream() {
    let mut workbook = Workbook::with_options(WorkbookOptions {
        version: BiffVersion::Biff5,
        timestamps: false,
        ..Default::default()
    })
    .unwrap();
    let sheet = workbook.add_worksheet("Legacy").unwrap();
    workbook.write_string(sheet, 0, 0, "caf\u{e9}", None).unwrap();
    workbook.write_number(sheet, 0, 1, 3.25, None).unwrap();

    let bytes = workbook.to_bytes().unwrap();
    assert_eq!(&bytes[..8], &SIGNATURE);
    let stream = workbook_stream(bytes, "Book");
    // BOF with BIFF5 version
    assert_eq!(&stream[..6], &[0x09, 0x08, 0x08, 0x00, 0x00, 0x05]);
    let offsets = boundsheet_offsets(&stream);
    assert_eq!(offsets.len(), 1);
    assert_eq!(&stream[offsets[0]..offsets[0] + 2], &[0x09, 0x08]);
}

#[test]
fn large_block_container() {
    let mut workbook = Workbook::with_options(WorkbookOptions {
        big_block_shift: 12,
        ..Default::default()
    })
    .unwrap();
    let sheet = workbook.add_worksheet("Big").unwrap();
    for row in 0..2000 {
        workbook
            .write_number(sheet, row, 0, f64::from(row), None)
            .unwrap();
    }
    let bytes = workbook.to_bytes().unwrap();
    // Version 4 header with 4096-byte sectors
    assert_eq!(&bytes[0x1A..0x1C], &[0x04, 0x00]);
    assert_eq!(&bytes[0x1E..0x20], &[0x0C, 0x00]);

    let stream = workbook_stream(bytes, "Workbook");
    assert_eq!(boundsheet_offsets(&stream).len(), 1);
}
