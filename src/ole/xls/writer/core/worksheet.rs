//! Per-worksheet state and substream assembly.
//!
//! Cell records are appended to the sheet's [`ByteStream`] as they are
//! written. Everything else (column info, page setup, protection, view
//! settings) is kept as plain state and serialized around the cell data
//! when the workbook is closed.

use log::{debug, warn};

use crate::ole::xls::writer::biff::cells::{
    MAX_LABEL_LEN, write_blank, write_formula, write_hlink_url, write_label, write_labelsst,
    write_number,
};
use crate::ole::xls::writer::biff::named_range::CellArea;
use crate::ole::xls::writer::biff::page_setup::{
    Margin, PageSetup, write_footer, write_hcenter, write_header, write_margin, write_setup,
    write_vcenter,
};
use crate::ole::xls::writer::biff::workbook::{
    write_bof, write_eof, write_externcount, write_externsheet_biff5,
};
use crate::ole::xls::writer::biff::worksheet::{
    password_hash, window2, write_colinfo, write_defcolwidth, write_dimensions, write_gridset,
    write_guts, write_mergedcells, write_pane, write_password, write_print_gridlines,
    write_print_headers, write_protect, write_row, write_scl, write_selection, write_window2,
    write_wsbool,
};
use crate::ole::xls::writer::biff::{BiffVersion, SUBSTREAM_WORKSHEET, biff8_char_count};
use crate::ole::xls::writer::byte_stream::ByteStream;
use crate::ole::xls::{XlsError, XlsResult};

use super::shared_strings::SharedStrings;

/// Rows per sheet
pub(crate) const MAX_ROWS: u32 = 65_536;
/// Highest column index
pub(crate) const MAX_COL: u16 = 255;
/// Longest BIFF8 cell text in UTF-16 units
pub(crate) const MAX_CELL_TEXT: usize = 32_767;

/// Default column width in characters
const DEFAULT_COLUMN_WIDTH: f64 = 8.43;

pub(crate) fn check_cell(row: u32, col: u16) -> XlsResult<()> {
    if row >= MAX_ROWS || col > MAX_COL {
        return Err(XlsError::CellOutOfRange {
            row,
            col: u32::from(col),
        });
    }
    Ok(())
}

/// COLINFO entry
#[derive(Debug, Clone, Copy)]
struct ColumnInfo {
    first_col: u16,
    last_col: u16,
    width: f64,
    xf_index: u16,
    hidden: bool,
}

/// Pane split, either frozen (row/column counts) or thawed (twips and
/// character widths)
#[derive(Debug, Clone, Copy)]
struct Panes {
    frozen: bool,
    y: f64,
    x: f64,
    top_row: u16,
    left_col: u16,
}

impl Panes {
    /// PANE `(x, y)` in record units and the active pane
    fn position(&self) -> (u16, u16, u8) {
        let (x, y) = if self.frozen {
            (self.x, self.y)
        } else {
            (113.879 * self.x + 390.0, 20.0 * self.y + 255.0)
        };
        let x = x.clamp(0.0, f64::from(u16::MAX)) as u16;
        let y = y.clamp(0.0, f64::from(u16::MAX)) as u16;
        let active = match (x != 0, y != 0) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        (x, y, active)
    }
}

/// Used cell range, inclusive
#[derive(Debug, Clone, Copy)]
struct Dimensions {
    first_row: u32,
    last_row: u32,
    first_col: u16,
    last_col: u16,
}

#[derive(Debug, Clone)]
struct Hyperlink {
    row: u16,
    col: u16,
    url: String,
}

/// A worksheet being built
#[derive(Debug)]
pub(crate) struct Worksheet {
    pub(crate) name: String,
    version: BiffVersion,
    data: ByteStream,
    dimensions: Option<Dimensions>,
    columns: Vec<ColumnInfo>,
    hyperlinks: Vec<Hyperlink>,
    merged: Vec<(u32, u32, u16, u16)>,
    selection: (u16, u16, u16, u16),
    panes: Option<Panes>,
    screen_gridlines: bool,
    print_gridlines: bool,
    print_headers: bool,
    zoom: u16,
    protect: bool,
    password: Option<u16>,
    pub(crate) setup: PageSetup,
    header: String,
    footer: String,
    margins: [f64; 4],
    hcenter: bool,
    vcenter: bool,
    fit_page: bool,
    pub(crate) print_area: Option<CellArea>,
    pub(crate) title_rows: Option<(u16, u16)>,
    pub(crate) title_cols: Option<(u16, u16)>,
    pub(crate) selected: bool,
}

impl Worksheet {
    pub(crate) fn new(name: String, version: BiffVersion) -> Self {
        Self {
            name,
            version,
            data: ByteStream::new(version),
            dimensions: None,
            columns: Vec::new(),
            hyperlinks: Vec::new(),
            merged: Vec::new(),
            selection: (0, 0, 0, 0),
            panes: None,
            screen_gridlines: true,
            print_gridlines: false,
            print_headers: false,
            zoom: 100,
            protect: false,
            password: None,
            setup: PageSetup::default(),
            header: String::new(),
            footer: String::new(),
            margins: [0.75, 0.75, 1.00, 1.00],
            hcenter: false,
            vcenter: false,
            fit_page: false,
            print_area: None,
            title_rows: None,
            title_cols: None,
            selected: false,
        }
    }

    fn touch(&mut self, row: u32, col: u16) {
        match &mut self.dimensions {
            Some(dim) => {
                dim.first_row = dim.first_row.min(row);
                dim.last_row = dim.last_row.max(row);
                dim.first_col = dim.first_col.min(col);
                dim.last_col = dim.last_col.max(col);
            },
            None => {
                self.dimensions = Some(Dimensions {
                    first_row: row,
                    last_row: row,
                    first_col: col,
                    last_col: col,
                });
            },
        }
    }

    pub(crate) fn write_number(&mut self, row: u32, col: u16, value: f64, xf: u16) -> XlsResult<()> {
        check_cell(row, col)?;
        self.data
            .record(|buf| write_number(buf, row, col, xf, value))?;
        self.touch(row, col);
        Ok(())
    }

    /// Write a string cell: LABEL for BIFF5, LABELSST for BIFF8
    pub(crate) fn write_string(
        &mut self,
        row: u32,
        col: u16,
        value: &str,
        xf: u16,
        sst: &mut SharedStrings,
    ) -> XlsResult<()> {
        check_cell(row, col)?;
        match self.version {
            BiffVersion::Biff5 => {
                let mut truncated = false;
                self.data.record(|buf| {
                    truncated = write_label(buf, row, col, xf, value)?;
                    Ok(())
                })?;
                if truncated {
                    warn!(
                        "string at ({}, {}) on '{}' cut to {} characters",
                        row, col, self.name, MAX_LABEL_LEN
                    );
                }
            },
            BiffVersion::Biff8 => {
                let len = biff8_char_count(value);
                if len > MAX_CELL_TEXT {
                    return Err(XlsError::StringTooLong {
                        row,
                        col: u32::from(col),
                        len,
                        max: MAX_CELL_TEXT,
                    });
                }
                let index = sst.add(value);
                self.data
                    .record(|buf| write_labelsst(buf, row, col, xf, index))?;
            },
        }
        self.touch(row, col);
        Ok(())
    }

    pub(crate) fn write_formula(&mut self, row: u32, col: u16, rgce: &[u8], xf: u16) -> XlsResult<()> {
        check_cell(row, col)?;
        self.data
            .record(|buf| write_formula(buf, row, col, xf, rgce))?;
        self.touch(row, col);
        Ok(())
    }

    pub(crate) fn write_blank(&mut self, row: u32, col: u16, xf: u16) -> XlsResult<()> {
        check_cell(row, col)?;
        self.data.record(|buf| write_blank(buf, row, col, xf))?;
        self.touch(row, col);
        Ok(())
    }

    /// Write the link text as a string cell and remember the target
    pub(crate) fn write_url(
        &mut self,
        row: u32,
        col: u16,
        url: &str,
        label: &str,
        xf: u16,
        sst: &mut SharedStrings,
    ) -> XlsResult<()> {
        self.write_string(row, col, label, xf, sst)?;
        self.hyperlinks.push(Hyperlink {
            row: row as u16,
            col,
            url: url.to_string(),
        });
        Ok(())
    }

    pub(crate) fn set_column(
        &mut self,
        first_col: u16,
        last_col: u16,
        width: Option<f64>,
        xf: u16,
        hidden: bool,
    ) -> XlsResult<()> {
        let (first_col, last_col) = (first_col.min(last_col), first_col.max(last_col));
        check_cell(0, last_col)?;
        self.columns.push(ColumnInfo {
            first_col,
            last_col,
            width: width.unwrap_or(DEFAULT_COLUMN_WIDTH),
            xf_index: xf,
            hidden,
        });
        Ok(())
    }

    /// ROW records go into the cell data in call order
    pub(crate) fn set_row(
        &mut self,
        row: u32,
        height: Option<f64>,
        xf: Option<u16>,
        hidden: bool,
    ) -> XlsResult<()> {
        check_cell(row, 0)?;
        self.data
            .record(|buf| write_row(buf, row as u16, height, xf, hidden, 0))
    }

    pub(crate) fn freeze_panes(&mut self, row: u16, col: u16) {
        self.panes = Some(Panes {
            frozen: true,
            y: f64::from(row),
            x: f64::from(col),
            top_row: row,
            left_col: col,
        });
    }

    /// Split panes at `y` points from the top and `x` character widths
    /// from the left
    pub(crate) fn thaw_panes(&mut self, y: f64, x: f64, top_row: u16, left_col: u16) {
        self.panes = Some(Panes {
            frozen: false,
            y,
            x,
            top_row,
            left_col,
        });
    }

    pub(crate) fn set_selection(
        &mut self,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
    ) -> XlsResult<()> {
        check_cell(first_row, first_col)?;
        check_cell(last_row, last_col)?;
        self.selection = (first_row as u16, first_col, last_row as u16, last_col);
        Ok(())
    }

    pub(crate) fn merge_cells(
        &mut self,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
    ) -> XlsResult<()> {
        check_cell(first_row, first_col)?;
        check_cell(last_row, last_col)?;
        self.merged.push((
            first_row.min(last_row),
            first_row.max(last_row),
            first_col.min(last_col),
            first_col.max(last_col),
        ));
        Ok(())
    }

    /// 0 shows all gridlines, 1 hides printed gridlines, 2 hides both
    pub(crate) fn hide_gridlines(&mut self, level: u8) {
        self.screen_gridlines = level < 2;
        if level >= 1 {
            self.print_gridlines = false;
        }
    }

    pub(crate) fn set_zoom(&mut self, zoom: u16) -> XlsResult<()> {
        if !(10..=400).contains(&zoom) {
            return Err(XlsError::InvalidData(format!(
                "Zoom factor {} outside range 10..=400",
                zoom
            )));
        }
        self.zoom = zoom;
        Ok(())
    }

    /// Protect the sheet; an empty password protects without one
    pub(crate) fn protect(&mut self, password: &str) {
        self.protect = true;
        self.password = (!password.is_empty()).then(|| password_hash(password));
    }

    pub(crate) fn set_header(&mut self, text: &str, margin: f64) -> XlsResult<()> {
        check_header_len(text)?;
        self.header = text.to_string();
        self.setup.header_margin = margin;
        Ok(())
    }

    pub(crate) fn set_footer(&mut self, text: &str, margin: f64) -> XlsResult<()> {
        check_header_len(text)?;
        self.footer = text.to_string();
        self.setup.footer_margin = margin;
        Ok(())
    }

    pub(crate) fn set_margins(&mut self, left: f64, right: f64, top: f64, bottom: f64) {
        self.margins = [left, right, top, bottom];
    }

    pub(crate) fn center_horizontally(&mut self, center: bool) {
        self.hcenter = center;
    }

    pub(crate) fn center_vertically(&mut self, center: bool) {
        self.vcenter = center;
    }

    pub(crate) fn print_gridlines(&mut self, print: bool) {
        self.print_gridlines = print;
    }

    pub(crate) fn print_row_col_headers(&mut self, print: bool) {
        self.print_headers = print;
    }

    pub(crate) fn fit_to_pages(&mut self, width: u16, height: u16) {
        self.fit_page = true;
        self.setup.fit_width = width;
        self.setup.fit_height = height;
    }

    pub(crate) fn set_print_scale(&mut self, scale: u16) -> XlsResult<()> {
        if !(10..=400).contains(&scale) {
            return Err(XlsError::InvalidData(format!(
                "Print scale {} outside range 10..=400",
                scale
            )));
        }
        self.fit_page = false;
        self.setup.scale = scale;
        Ok(())
    }

    fn window2_flags(&self, active: bool) -> u16 {
        let mut grbit = window2::DISPLAY_HEADINGS
            | window2::DISPLAY_ZEROS
            | window2::DEFAULT_HEADER_COLOR
            | window2::DISPLAY_GUTS;
        if self.screen_gridlines {
            grbit |= window2::DISPLAY_GRIDLINES;
        }
        if self.panes.is_some_and(|p| p.frozen) {
            grbit |= window2::FROZEN;
        }
        if self.selected {
            grbit |= window2::SELECTED;
        }
        if active {
            grbit |= window2::ACTIVE;
        }
        grbit
    }

    /// Serialize the complete worksheet substream.
    ///
    /// `sheet_names` lists every sheet of the workbook in order; BIFF5
    /// sheets carry an EXTERNSHEET entry for each one.
    pub(crate) fn close(&self, sheet_names: &[&str], active: bool) -> XlsResult<ByteStream> {
        let version = self.version;
        let mut stream = self.data.clone();

        // Records in front of the cell data, innermost first
        match self.dimensions {
            Some(dim) => stream.prepend_record(|buf| {
                write_dimensions(
                    buf,
                    version,
                    dim.first_row,
                    dim.last_row + 1,
                    dim.first_col,
                    dim.last_col + 1,
                )
            })?,
            None => stream.prepend_record(|buf| write_dimensions(buf, version, 0, 0, 0, 0))?,
        }
        if self.protect {
            if let Some(hash) = self.password {
                stream.prepend_record(|buf| write_password(buf, hash))?;
            }
            stream.prepend_record(|buf| write_protect(buf, true))?;
        }
        stream.prepend_record(|buf| write_setup(buf, &self.setup))?;
        for (margin, inches) in [Margin::Bottom, Margin::Top, Margin::Right, Margin::Left]
            .into_iter()
            .zip(self.margins.iter().rev())
        {
            stream.prepend_record(|buf| write_margin(buf, margin, *inches))?;
        }
        stream.prepend_record(|buf| write_vcenter(buf, self.vcenter))?;
        stream.prepend_record(|buf| write_hcenter(buf, self.hcenter))?;
        stream.prepend_record(|buf| write_footer(buf, version, &self.footer))?;
        stream.prepend_record(|buf| write_header(buf, version, &self.header))?;
        stream.prepend_record(|buf| write_wsbool(buf, self.fit_page))?;
        stream.prepend_record(|buf| write_gridset(buf, self.print_gridlines))?;
        if version == BiffVersion::Biff5 {
            stream.prepend_record(write_guts)?;
        }
        stream.prepend_record(|buf| write_print_gridlines(buf, self.print_gridlines))?;
        stream.prepend_record(|buf| write_print_headers(buf, self.print_headers))?;
        if version == BiffVersion::Biff5 {
            for name in sheet_names.iter().rev() {
                let target = (*name != self.name).then_some(*name);
                stream.prepend_record(|buf| write_externsheet_biff5(buf, target))?;
            }
            stream.prepend_record(|buf| write_externcount(buf, sheet_names.len() as u16))?;
        }
        if !self.columns.is_empty() {
            for info in self.columns.iter().rev() {
                stream.prepend_record(|buf| {
                    write_colinfo(
                        buf,
                        version,
                        info.first_col,
                        info.last_col,
                        info.width,
                        info.xf_index,
                        info.hidden,
                    )
                })?;
            }
            stream.prepend_record(|buf| write_defcolwidth(buf, 8))?;
        }
        stream.prepend_record(|buf| write_bof(buf, version, SUBSTREAM_WORKSHEET))?;

        // View settings after the cell data
        stream.record(|buf| write_window2(buf, version, self.window2_flags(active)))?;
        if self.zoom != 100 {
            stream.record(|buf| write_scl(buf, self.zoom))?;
        }
        let mut pane = 3;
        if let Some(panes) = &self.panes {
            let (x, y, active_pane) = panes.position();
            pane = active_pane;
            stream.record(|buf| write_pane(buf, x, y, panes.top_row, panes.left_col, active_pane))?;
        }
        let (first_row, first_col, last_row, last_col) = self.selection;
        stream.record(|buf| write_selection(buf, pane, first_row, first_col, last_row, last_col))?;
        if !self.merged.is_empty() {
            stream.record(|buf| write_mergedcells(buf, version, self.merged.iter().copied()))?;
        }
        if version == BiffVersion::Biff8 {
            for link in &self.hyperlinks {
                stream.record(|buf| {
                    write_hlink_url(buf, link.row, link.row, link.col, link.col, &link.url)
                })?;
            }
        }
        stream.record(write_eof)?;

        debug!("worksheet '{}' closed at {} bytes", self.name, stream.len());
        Ok(stream)
    }
}

fn check_header_len(text: &str) -> XlsResult<()> {
    let len = text.chars().count();
    if len > 255 {
        return Err(XlsError::InvalidData(format!(
            "Header or footer of {} characters exceeds 255",
            len
        )));
    }
    Ok(())
}
