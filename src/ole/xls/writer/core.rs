//! XLS workbook writer
//!
//! A [`Workbook`] collects worksheets, formats and cell data in memory and
//! produces the complete compound document when it is closed. Worksheets
//! and formats are addressed by the index returned when they are added.
//!
//! # Architecture
//!
//! The workbook owns every cross-reference table (formats, fonts, shared
//! strings, palette, formula sheet names). Worksheets only hold their own
//! records and receive the tables they need as arguments. On close:
//!
//! 1. every worksheet substream is finalized
//! 2. the globals substream is written, with BOUNDSHEET offsets computed
//!    from the finalized sheet sizes
//! 3. globals and sheets are stored as the `Workbook` (BIFF8) or `Book`
//!    (BIFF5) stream of a new compound document
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::{FormatProperties, Workbook};
//!
//! let mut workbook = Workbook::new()?;
//! let sheet = workbook.add_worksheet("Report")?;
//! let bold = workbook.add_format(FormatProperties {
//!     bold: true,
//!     ..Default::default()
//! })?;
//!
//! workbook.write_string(sheet, 0, 0, "Total", Some(bold))?;
//! workbook.write_number(sheet, 1, 0, 42.0, None)?;
//! workbook.write_formula(sheet, 2, 0, "=SUM(A2:A2)", None)?;
//!
//! workbook.save("report.xls")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use super::super::error::{XlsError, XlsResult};
use super::biff::named_range::CellArea;
use super::biff::{BiffVersion, check_float_layout};
use super::formatting::{Format, FormatProperties, FormattingManager, Palette};
use super::formula::FormulaCompiler;
use crate::ole::writer::{OleWriter, OleWriterOptions};

mod shared_strings;
mod stream;
mod worksheet;

use self::shared_strings::SharedStrings;
use self::stream::{Globals, generate_workbook_stream};
use self::worksheet::{Worksheet, check_cell};

/// Longest sheet name
const MAX_SHEET_NAME_LEN: usize = 31;

/// URL schemes that make [`Workbook::write`] create a link cell
const URL_PREFIXES: [&str; 4] = ["http://", "https://", "ftp://", "mailto:"];

/// Workbook configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookOptions {
    /// Record format generation
    pub version: BiffVersion,
    /// Compound document big block exponent (9 or 12)
    pub big_block_shift: u16,
    /// Compound document small block exponent (6)
    pub small_block_shift: u16,
    /// Prefix for sheets added with an empty name
    pub sheet_name_prefix: String,
    /// CODEPAGE value; the version default when unset
    pub codepage: Option<u16>,
    /// Use the 1904 date system
    pub date_1904: bool,
    /// Stamp the root entry with the current time
    pub timestamps: bool,
}

impl Default for WorkbookOptions {
    fn default() -> Self {
        Self {
            version: BiffVersion::Biff8,
            big_block_shift: 9,
            small_block_shift: 6,
            sheet_name_prefix: "Sheet".to_string(),
            codepage: None,
            date_1904: false,
            timestamps: true,
        }
    }
}

/// Cell value for [`Workbook::write`]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    /// Text; formulas, URLs and numbers written as text are recognised
    String(String),
    /// Formula text, with or without the leading `=`
    Formula(String),
    Blank,
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

/// Decimal number text such as `-1.5`, `.5` or `2E10`
fn looks_numeric(value: &str) -> bool {
    let body = value.strip_prefix(['+', '-']).unwrap_or(value);
    let mantissa = body.split(['e', 'E']).next().unwrap_or("");
    let starts_with_digit = mantissa.starts_with(|c: char| c.is_ascii_digit())
        || mantissa
            .strip_prefix('.')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));
    starts_with_digit
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        && value.parse::<f64>().is_ok()
}

/// XLS workbook writer
///
/// All data is buffered in memory until [`close`](Self::close). After the
/// workbook is closed every mutating call fails with
/// [`XlsError::WorkbookClosed`].
#[derive(Debug)]
pub struct Workbook {
    options: WorkbookOptions,
    path: Option<PathBuf>,
    worksheets: Vec<Worksheet>,
    fmt: FormattingManager,
    palette: Palette,
    strings: SharedStrings,
    compiler: FormulaCompiler,
    url_format: usize,
    active: usize,
    first_sheet: usize,
    country: Option<u16>,
    output: Option<Vec<u8>>,
}

impl Workbook {
    /// Create an in-memory BIFF8 workbook
    pub fn new() -> XlsResult<Self> {
        Self::with_options(WorkbookOptions::default())
    }

    /// Create a workbook with explicit options.
    ///
    /// Fails on hosts whose `f64` layout cannot be converted to the
    /// little-endian wire format.
    pub fn with_options(options: WorkbookOptions) -> XlsResult<Self> {
        check_float_layout()?;

        let version = options.version;
        let mut fmt = FormattingManager::new(version);
        let url_format = fmt.add_format(FormatProperties {
            color: Some("blue".into()),
            underline: 1,
            ..Default::default()
        });

        Ok(Self {
            options,
            path: None,
            worksheets: Vec::new(),
            fmt,
            palette: Palette::new(),
            strings: SharedStrings::new(),
            compiler: FormulaCompiler::new(version),
            url_format,
            active: 0,
            first_sheet: 0,
            country: None,
            output: None,
        })
    }

    /// Create a workbook that is written to `path` when closed
    pub fn create<P: AsRef<Path>>(path: P) -> XlsResult<Self> {
        Self::create_with_options(path, WorkbookOptions::default())
    }

    pub fn create_with_options<P: AsRef<Path>>(path: P, options: WorkbookOptions) -> XlsResult<Self> {
        let mut workbook = Self::with_options(options)?;
        workbook.path = Some(path.as_ref().to_path_buf());
        Ok(workbook)
    }

    pub fn version(&self) -> BiffVersion {
        self.options.version
    }

    pub fn is_closed(&self) -> bool {
        self.output.is_some()
    }

    fn check_open(&self) -> XlsResult<()> {
        if self.is_closed() {
            return Err(XlsError::WorkbookClosed);
        }
        Ok(())
    }

    fn sheet_mut(&mut self, sheet: usize) -> XlsResult<&mut Worksheet> {
        self.check_open()?;
        self.worksheets
            .get_mut(sheet)
            .ok_or(XlsError::WorksheetNotFound(sheet))
    }

    /// Add a new worksheet
    ///
    /// # Arguments
    ///
    /// * `name` - Worksheet name (max 31 characters); an empty name
    ///   becomes the configured prefix followed by the sheet number
    ///
    /// # Returns
    ///
    /// * `Result<usize, XlsError>` - Worksheet index or error
    pub fn add_worksheet(&mut self, name: &str) -> XlsResult<usize> {
        self.check_open()?;
        let index = self.worksheets.len();

        let name = if name.is_empty() {
            format!("{}{}", self.options.sheet_name_prefix, index + 1)
        } else {
            name.to_string()
        };
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(XlsError::SheetNameTooLong { name });
        }
        if self.worksheets.iter().any(|ws| ws.name == name) {
            return Err(XlsError::DuplicateSheetName { name });
        }

        self.compiler.register_sheet(&name, index as u16);
        self.worksheets
            .push(Worksheet::new(name, self.options.version));
        Ok(index)
    }

    /// Register a cell format and return its handle
    pub fn add_format(&mut self, props: FormatProperties) -> XlsResult<usize> {
        self.check_open()?;
        Ok(self.fmt.add_format(props))
    }

    /// Adjust a registered format before the workbook is closed
    pub fn format_mut(&mut self, format: usize) -> XlsResult<&mut Format> {
        self.check_open()?;
        self.fmt.format_mut(format)
    }

    pub fn format(&self, format: usize) -> XlsResult<&Format> {
        self.fmt.format(format)
    }

    /// Handle of the blue underlined format used for links
    pub fn url_format(&self) -> usize {
        self.url_format
    }

    /// Replace palette entry `index` (8..=64) and return the index
    pub fn set_custom_color(&mut self, index: u32, red: u32, green: u32, blue: u32) -> XlsResult<u16> {
        self.check_open()?;
        self.palette.set(index, red, green, blue)
    }

    /// Write a COUNTRY record with this country code
    pub fn set_country(&mut self, code: u16) -> XlsResult<()> {
        self.check_open()?;
        self.country = Some(code);
        Ok(())
    }

    /// Set the date system (1900 vs 1904)
    pub fn set_1904(&mut self, use_1904: bool) -> XlsResult<()> {
        self.check_open()?;
        self.options.date_1904 = use_1904;
        Ok(())
    }

    /// First sheet tab shown in the tab bar
    pub fn set_first_sheet(&mut self, sheet: usize) -> XlsResult<()> {
        self.sheet_mut(sheet)?;
        self.first_sheet = sheet;
        Ok(())
    }

    /// Make `sheet` the sheet shown when the file is opened
    pub fn activate(&mut self, sheet: usize) -> XlsResult<()> {
        self.sheet_mut(sheet)?.selected = true;
        self.active = sheet;
        Ok(())
    }

    /// Select the tab of `sheet`
    pub fn select(&mut self, sheet: usize) -> XlsResult<()> {
        self.sheet_mut(sheet)?.selected = true;
        Ok(())
    }

    pub fn worksheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|ws| ws.name.as_str()).collect()
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name == name)
    }

    /// Write a value, choosing the record from its content.
    ///
    /// Strings starting with `=` are formulas, empty strings are blank
    /// cells, strings starting with a URL scheme become links and number
    /// text becomes a number.
    pub fn write(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: impl Into<CellValue>,
        format: Option<usize>,
    ) -> XlsResult<()> {
        match value.into() {
            CellValue::Number(value) => self.write_number(sheet, row, col, value, format),
            CellValue::Formula(formula) => self.write_formula(sheet, row, col, &formula, format),
            CellValue::Blank => self.write_blank(sheet, row, col, format),
            CellValue::String(text) => {
                if text.starts_with('=') {
                    self.write_formula(sheet, row, col, &text, format)
                } else if text.is_empty() {
                    self.write_blank(sheet, row, col, format)
                } else if URL_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
                    self.write_url(sheet, row, col, &text, None, format)
                } else if looks_numeric(&text) {
                    let value = text.parse::<f64>().map_err(|e| {
                        XlsError::InvalidData(format!("Invalid number '{}': {}", text, e))
                    })?;
                    self.write_number(sheet, row, col, value, format)
                } else {
                    self.write_string(sheet, row, col, &text, format)
                }
            },
        }
    }

    /// Write a number value to a cell
    ///
    /// # Arguments
    ///
    /// * `sheet` - Worksheet index
    /// * `row` - Row index (0-based)
    /// * `col` - Column index (0-based)
    /// * `value` - Numeric value
    /// * `format` - Format handle, or `None` for the default format
    pub fn write_number(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: f64,
        format: Option<usize>,
    ) -> XlsResult<()> {
        let xf = self.fmt.xf_index(format)?;
        self.sheet_mut(sheet)?.write_number(row, col, value, xf)
    }

    /// Write a string value to a cell
    ///
    /// BIFF5 strings longer than 255 characters are cut; BIFF8 strings go
    /// through the shared string table and are limited to 32767 UTF-16
    /// units.
    pub fn write_string(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: &str,
        format: Option<usize>,
    ) -> XlsResult<()> {
        let xf = self.fmt.xf_index(format)?;
        self.check_open()?;
        let ws = self
            .worksheets
            .get_mut(sheet)
            .ok_or(XlsError::WorksheetNotFound(sheet))?;
        ws.write_string(row, col, value, xf, &mut self.strings)
    }

    /// Compile a formula and write it to a cell
    ///
    /// A leading `=` is optional. Compilation errors are returned and no
    /// record is written.
    pub fn write_formula(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        formula: &str,
        format: Option<usize>,
    ) -> XlsResult<()> {
        let xf = self.fmt.xf_index(format)?;
        self.sheet_mut(sheet)?;
        check_cell(row, col)?;
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        let rgce = self.compiler.compile(formula)?;
        self.sheet_mut(sheet)?.write_formula(row, col, &rgce, xf)
    }

    /// Write a formatted empty cell. Without a format nothing is written.
    pub fn write_blank(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        format: Option<usize>,
    ) -> XlsResult<()> {
        let Some(format) = format else {
            self.sheet_mut(sheet)?;
            return check_cell(row, col);
        };
        let xf = self.fmt.xf_index(Some(format))?;
        self.sheet_mut(sheet)?.write_blank(row, col, xf)
    }

    /// Write a link. The cell shows `label` (the URL when `None`) in the
    /// link format unless another format is given.
    pub fn write_url(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        url: &str,
        label: Option<&str>,
        format: Option<usize>,
    ) -> XlsResult<()> {
        let xf = self.fmt.xf_index(Some(format.unwrap_or(self.url_format)))?;
        self.check_open()?;
        let ws = self
            .worksheets
            .get_mut(sheet)
            .ok_or(XlsError::WorksheetNotFound(sheet))?;
        ws.write_url(row, col, url, label.unwrap_or(url), xf, &mut self.strings)
    }

    /// Set width (in characters), format and visibility of a column range
    pub fn set_column(
        &mut self,
        sheet: usize,
        first_col: u16,
        last_col: u16,
        width: Option<f64>,
        format: Option<usize>,
        hidden: bool,
    ) -> XlsResult<()> {
        let xf = self.fmt.xf_index(format)?;
        self.sheet_mut(sheet)?
            .set_column(first_col, last_col, width, xf, hidden)
    }

    /// Set height (in points), format and visibility of a row
    pub fn set_row(
        &mut self,
        sheet: usize,
        row: u32,
        height: Option<f64>,
        format: Option<usize>,
        hidden: bool,
    ) -> XlsResult<()> {
        let xf = format.map(|f| self.fmt.xf_index(Some(f))).transpose()?;
        self.sheet_mut(sheet)?.set_row(row, height, xf, hidden)
    }

    /// Keep the top `row` rows and left `col` columns in view
    pub fn freeze_panes(&mut self, sheet: usize, row: u32, col: u16) -> XlsResult<()> {
        check_cell(row, col)?;
        self.sheet_mut(sheet)?.freeze_panes(row as u16, col);
        Ok(())
    }

    /// Split the window `y` points from the top and `x` character widths
    /// from the left
    pub fn thaw_panes(
        &mut self,
        sheet: usize,
        y: f64,
        x: f64,
        top_row: u32,
        left_col: u16,
    ) -> XlsResult<()> {
        check_cell(top_row, left_col)?;
        self.sheet_mut(sheet)?
            .thaw_panes(y, x, top_row as u16, left_col);
        Ok(())
    }

    pub fn set_selection(
        &mut self,
        sheet: usize,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
    ) -> XlsResult<()> {
        self.sheet_mut(sheet)?
            .set_selection(first_row, first_col, last_row, last_col)
    }

    pub fn merge_cells(
        &mut self,
        sheet: usize,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
    ) -> XlsResult<()> {
        self.sheet_mut(sheet)?
            .merge_cells(first_row, first_col, last_row, last_col)
    }

    /// 0 shows all gridlines, 1 hides printed gridlines, 2 hides screen
    /// and printed gridlines
    pub fn hide_gridlines(&mut self, sheet: usize, level: u8) -> XlsResult<()> {
        self.sheet_mut(sheet)?.hide_gridlines(level);
        Ok(())
    }

    /// Zoom in percent (10..=400)
    pub fn set_zoom(&mut self, sheet: usize, zoom: u16) -> XlsResult<()> {
        self.sheet_mut(sheet)?.set_zoom(zoom)
    }

    /// Protect the sheet, with a password unless `password` is empty
    pub fn protect(&mut self, sheet: usize, password: &str) -> XlsResult<()> {
        self.sheet_mut(sheet)?.protect(password);
        Ok(())
    }

    pub fn set_landscape(&mut self, sheet: usize) -> XlsResult<()> {
        self.sheet_mut(sheet)?.setup.portrait = false;
        Ok(())
    }

    pub fn set_portrait(&mut self, sheet: usize) -> XlsResult<()> {
        self.sheet_mut(sheet)?.setup.portrait = true;
        Ok(())
    }

    /// Printer paper size code (0 = printer default, 9 = A4, ...)
    pub fn set_paper(&mut self, sheet: usize, paper: u16) -> XlsResult<()> {
        self.sheet_mut(sheet)?.setup.paper_size = paper;
        Ok(())
    }

    /// Page header text (max 255 characters) and its margin in inches
    pub fn set_header(&mut self, sheet: usize, text: &str, margin: f64) -> XlsResult<()> {
        self.sheet_mut(sheet)?.set_header(text, margin)
    }

    pub fn set_footer(&mut self, sheet: usize, text: &str, margin: f64) -> XlsResult<()> {
        self.sheet_mut(sheet)?.set_footer(text, margin)
    }

    /// Page margins in inches
    pub fn set_margins(
        &mut self,
        sheet: usize,
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    ) -> XlsResult<()> {
        self.sheet_mut(sheet)?
            .set_margins(left, right, top, bottom);
        Ok(())
    }

    pub fn center_horizontally(&mut self, sheet: usize, center: bool) -> XlsResult<()> {
        self.sheet_mut(sheet)?.center_horizontally(center);
        Ok(())
    }

    pub fn center_vertically(&mut self, sheet: usize, center: bool) -> XlsResult<()> {
        self.sheet_mut(sheet)?.center_vertically(center);
        Ok(())
    }

    /// Print rows `first..=last` at the top of every page
    pub fn repeat_rows(&mut self, sheet: usize, first_row: u32, last_row: u32) -> XlsResult<()> {
        check_cell(first_row, 0)?;
        check_cell(last_row, 0)?;
        let (first, last) = (first_row.min(last_row), first_row.max(last_row));
        self.sheet_mut(sheet)?.title_rows = Some((first as u16, last as u16));
        Ok(())
    }

    /// Print columns `first..=last` at the left of every page
    pub fn repeat_columns(&mut self, sheet: usize, first_col: u16, last_col: u16) -> XlsResult<()> {
        check_cell(0, first_col)?;
        check_cell(0, last_col)?;
        let (first, last) = (first_col.min(last_col), first_col.max(last_col));
        self.sheet_mut(sheet)?.title_cols = Some((first, last));
        Ok(())
    }

    /// Limit printing to a cell range
    pub fn print_area(
        &mut self,
        sheet: usize,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
    ) -> XlsResult<()> {
        check_cell(first_row, first_col)?;
        check_cell(last_row, last_col)?;
        self.sheet_mut(sheet)?.print_area = Some(CellArea::new(
            first_row as u16,
            last_row as u16,
            first_col,
            last_col,
        ));
        Ok(())
    }

    pub fn print_gridlines(&mut self, sheet: usize, print: bool) -> XlsResult<()> {
        self.sheet_mut(sheet)?.print_gridlines(print);
        Ok(())
    }

    pub fn print_row_col_headers(&mut self, sheet: usize, print: bool) -> XlsResult<()> {
        self.sheet_mut(sheet)?.print_row_col_headers(print);
        Ok(())
    }

    /// Scale the printout to `width` by `height` pages (0 = no limit)
    pub fn fit_to_pages(&mut self, sheet: usize, width: u16, height: u16) -> XlsResult<()> {
        self.sheet_mut(sheet)?.fit_to_pages(width, height);
        Ok(())
    }

    /// Print scale in percent (10..=400); turns off fit-to-pages
    pub fn set_print_scale(&mut self, sheet: usize, scale: u16) -> XlsResult<()> {
        self.sheet_mut(sheet)?.set_print_scale(scale)
    }

    /// Finalize the workbook.
    ///
    /// The first call serializes every sheet and the globals and builds
    /// the compound document (written to the path given to
    /// [`create`](Self::create), if any). Later calls do nothing.
    pub fn close(&mut self) -> XlsResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        if self.worksheets.is_empty() {
            debug!("no worksheets added, adding a default sheet");
            self.add_worksheet("")?;
        }
        if self.active == 0 {
            self.worksheets[0].selected = true;
        }

        let version = self.options.version;
        let names: Vec<&str> = self.worksheets.iter().map(|ws| ws.name.as_str()).collect();
        let bodies = self
            .worksheets
            .iter()
            .enumerate()
            .map(|(index, ws)| ws.close(&names, index == self.active))
            .collect::<XlsResult<Vec<_>>>()?;

        let selected = self.worksheets.iter().filter(|ws| ws.selected).count();
        let globals = Globals {
            version,
            codepage: self
                .options
                .codepage
                .unwrap_or_else(|| version.default_codepage()),
            date_1904: self.options.date_1904,
            active: self.active as u16,
            first_tab: self.first_sheet as u16,
            selected: selected as u16,
            country: self.country,
            palette: &self.palette,
            strings: &self.strings,
        };
        let stream = generate_workbook_stream(
            &globals,
            &mut self.fmt,
            self.compiler.externs_mut(),
            &self.worksheets,
            &bodies,
        )?;

        let document = self.build_document(stream)?;
        debug!(
            "workbook closed: {} sheets, {} bytes",
            self.worksheets.len(),
            document.len()
        );
        if let Some(path) = &self.path {
            std::fs::write(path, &document)?;
        }
        self.output = Some(document);
        Ok(())
    }

    fn build_document(&self, stream: Vec<u8>) -> XlsResult<Vec<u8>> {
        let now = self.options.timestamps.then(Utc::now);
        let mut ole = OleWriter::with_options(OleWriterOptions {
            big_block_shift: self.options.big_block_shift,
            small_block_shift: self.options.small_block_shift,
            created: now,
            modified: now,
        })?;
        let root = ole.root();
        ole.add_stream(root, self.options.version.stream_name(), stream)?;
        Ok(ole.to_bytes()?)
    }

    /// Close the workbook and return the compound document bytes
    pub fn to_bytes(&mut self) -> XlsResult<Vec<u8>> {
        self.close()?;
        Ok(self.output.clone().unwrap_or_default())
    }

    /// Close the workbook and write the document to `writer`
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> XlsResult<()> {
        self.close()?;
        if let Some(document) = &self.output {
            writer.write_all(document)?;
        }
        Ok(())
    }

    /// Close the workbook and save the document to `path`
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> XlsResult<()> {
        self.close()?;
        if let Some(document) = &self.output {
            std::fs::write(path, document)?;
        }
        Ok(())
    }
}
