//! XLS cell formatting (XF records, fonts, number formats, palette)
//!
//! A [`Format`] describes everything a cell can carry: font, alignment,
//! borders, fill, number format and protection. Formats are registered
//! with the workbook and referenced by cells through their XF index.
//!
//! # Key Structures
//!
//! - **XF (Extended Format)**: 16 bytes in BIFF5, 20 bytes in BIFF8
//! - **FONT**: Font definition, deduplicated by [`FontKey`]
//! - **FORMAT**: Number format strings, custom ones numbered from 164
//! - **PALETTE**: 56 RGB entries for color indices 8..=63
//!
//! Font and number format indices are only known once every format has
//! been registered, so [`FormattingManager`] assigns them when the
//! workbook globals are written.

use std::collections::HashMap;
use std::io::Write;

use bitflags::bitflags;
use log::{debug, warn};
use phf::phf_map;
use serde::{Deserialize, Serialize};

use super::super::{XlsError, XlsResult};
use super::biff::workbook::write_format_record;
use super::biff::{BiffVersion, byte_string, record_len, write_record_header};

/// Font weight constants
pub const FONT_WEIGHT_NORMAL: u16 = 400;
pub const FONT_WEIGHT_BOLD: u16 = 700;

/// System default color
pub const COLOR_AUTOMATIC: u16 = 0x7FFF;

/// Default pattern colors
const COLOR_FG_DEFAULT: u16 = 0x40;
const COLOR_BG_DEFAULT: u16 = 0x41;

/// Style XFs plus the default cell XF
pub const FIRST_USER_XF: u16 = 16;

/// First user-defined number format index
const FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX: u16 = 164;

/// Named colors and their palette indices
static NAMED_COLORS: phf::Map<&'static str, u16> = phf_map! {
    "black" => 0x08,
    "white" => 0x09,
    "red" => 0x0A,
    "lime" => 0x0B,
    "blue" => 0x0C,
    "yellow" => 0x0D,
    "magenta" => 0x0E,
    "fuchsia" => 0x0E,
    "cyan" => 0x0F,
    "aqua" => 0x0F,
    "brown" => 0x10,
    "green" => 0x11,
    "navy" => 0x12,
    "purple" => 0x14,
    "silver" => 0x16,
    "gray" => 0x17,
    "grey" => 0x17,
    "orange" => 0x35,
};

/// Built-in number format strings that have a fixed index
const BUILTIN_NUMBER_FORMATS: &[(u16, &str)] = &[
    (0x00, "General"),
    (0x01, "0"),
    (0x02, "0.00"),
    (0x03, "#,##0"),
    (0x04, "#,##0.00"),
    (0x09, "0%"),
    (0x0A, "0.00%"),
    (0x0B, "0.00E+00"),
    (0x0C, "# ?/?"),
    (0x0D, "# ??/??"),
    (0x0E, "m/d/yy"),
    (0x0F, "d-mmm-yy"),
    (0x10, "d-mmm"),
    (0x11, "mmm-yy"),
    (0x12, "h:mm AM/PM"),
    (0x13, "h:mm:ss AM/PM"),
    (0x14, "h:mm"),
    (0x15, "h:mm:ss"),
    (0x16, "m/d/yy h:mm"),
    (0x25, "#,##0_);(#,##0)"),
    (0x26, "#,##0_);[Red](#,##0)"),
    (0x27, "#,##0.00_);(#,##0.00)"),
    (0x28, "#,##0.00_);[Red](#,##0.00)"),
    (0x2D, "mm:ss"),
    (0x2E, "[h]:mm:ss"),
    (0x2F, "mm:ss.0"),
    (0x30, "##0.0E+0"),
    (0x31, "@"),
];

/// Index of a built-in number format.
///
/// A bare integer such as `"14"` is taken as the index itself. Strings of
/// digits with leading zeros (`"00"`, `"000"`) are real format patterns.
pub fn builtin_number_format(pattern: &str) -> Option<u16> {
    let digits = !pattern.is_empty() && pattern.bytes().all(|b| b.is_ascii_digit());
    let zero_padded = pattern.len() > 1 && pattern.starts_with('0');
    if digits && !zero_padded {
        return pattern.parse().ok();
    }
    BUILTIN_NUMBER_FORMATS
        .iter()
        .find(|(_, p)| *p == pattern)
        .map(|&(index, _)| index)
}

/// A color given by palette index or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Index(u16),
    Named(String),
}

impl Color {
    /// Palette index, or [`COLOR_AUTOMATIC`] for unknown names and
    /// indices above 63
    pub fn index(&self) -> u16 {
        match self {
            Color::Index(index) if *index <= 63 => *index,
            Color::Index(index) => {
                warn!("color index {} is out of range, using the system color", index);
                COLOR_AUTOMATIC
            },
            Color::Named(name) => match NAMED_COLORS.get(name.to_ascii_lowercase().as_str()) {
                Some(&index) => index,
                None => {
                    warn!("unknown color name '{}', using the system color", name);
                    COLOR_AUTOMATIC
                },
            },
        }
    }
}

impl From<u16> for Color {
    fn from(index: u16) -> Self {
        Color::Index(index)
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Color::Named(name.to_string())
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    #[default]
    General = 0,
    Left = 1,
    Center = 2,
    Right = 3,
    Fill = 4,
    Justify = 5,
    /// Center across selection
    Merge = 6,
    EqualSpace = 7,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top = 0,
    Center = 1,
    #[default]
    Bottom = 2,
    Justify = 3,
    EqualSpace = 4,
}

/// Text orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRotation {
    #[default]
    None,
    /// Letters stacked top to bottom
    Stacked,
    /// Rotated 90 degrees counterclockwise
    Up,
    /// Rotated 90 degrees clockwise
    Down,
}

impl TextRotation {
    fn code(self, version: BiffVersion) -> u8 {
        match (version, self) {
            (_, TextRotation::None) => 0,
            (BiffVersion::Biff5, TextRotation::Stacked) => 1,
            (BiffVersion::Biff5, TextRotation::Down) => 2,
            (BiffVersion::Biff5, TextRotation::Up) => 3,
            (BiffVersion::Biff8, TextRotation::Stacked) => 255,
            (BiffVersion::Biff8, TextRotation::Down) => 90,
            (BiffVersion::Biff8, TextRotation::Up) => 180,
        }
    }
}

/// Border style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None = 0,
    Thin = 1,
    Medium = 2,
    Dashed = 3,
    Dotted = 4,
    Thick = 5,
    Double = 6,
    Hair = 7,
}

/// Every option a cell format can carry.
///
/// Unset colors use the system defaults. Setting a foreground or
/// background color without a pattern selects the solid pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatProperties {
    pub font_name: String,
    /// Font size in points
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    /// 0 = none, 1 = single, 2 = double, 0x21 / 0x22 = accounting
    pub underline: u8,
    pub strikeout: bool,
    pub outline: bool,
    pub shadow: bool,
    /// 0 = none, 1 = superscript, 2 = subscript
    pub script: u8,
    pub color: Option<Color>,
    pub family: u8,
    pub charset: u8,
    /// Built-in index (`"14"`) or format pattern (`"0.000"`)
    pub num_format: Option<String>,
    pub align: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub text_wrap: bool,
    pub text_justlast: bool,
    pub rotation: TextRotation,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
    pub pattern: u8,
    pub bottom: BorderStyle,
    pub top: BorderStyle,
    pub left: BorderStyle,
    pub right: BorderStyle,
    pub bottom_color: Option<Color>,
    pub top_color: Option<Color>,
    pub left_color: Option<Color>,
    pub right_color: Option<Color>,
    pub locked: bool,
    pub hidden: bool,
}

impl Default for FormatProperties {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            size: 10.0,
            bold: false,
            italic: false,
            underline: 0,
            strikeout: false,
            outline: false,
            shadow: false,
            script: 0,
            color: None,
            family: 0,
            charset: 0,
            num_format: None,
            align: HorizontalAlignment::General,
            valign: VerticalAlignment::Bottom,
            text_wrap: false,
            text_justlast: false,
            rotation: TextRotation::None,
            fg_color: None,
            bg_color: None,
            pattern: 0,
            bottom: BorderStyle::None,
            top: BorderStyle::None,
            left: BorderStyle::None,
            right: BorderStyle::None,
            bottom_color: None,
            top_color: None,
            left_color: None,
            right_color: None,
            locked: false,
            hidden: false,
        }
    }
}

/// Font identity used for FONT record deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    name: String,
    height: u16,
    script: u8,
    underline: u8,
    strikeout: bool,
    weight: u16,
    outline: bool,
    family: u8,
    charset: u8,
    shadow: bool,
    color: u16,
    italic: bool,
}

/// A registered cell format
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    xf_index: u16,
    props: FormatProperties,
    font_index: u16,
    num_format_index: u16,
}

impl Format {
    pub(crate) fn new(xf_index: u16, props: FormatProperties) -> Self {
        let mut format = Self {
            xf_index,
            props,
            font_index: 0,
            num_format_index: 0,
        };
        if (format.props.fg_color.is_some() || format.props.bg_color.is_some())
            && format.props.pattern == 0
        {
            format.props.pattern = 1;
        }
        format
    }

    /// XF index cells use to refer to this format
    pub fn xf_index(&self) -> u16 {
        self.xf_index
    }

    pub fn properties(&self) -> &FormatProperties {
        &self.props
    }

    /// Font index assigned when the workbook is closed
    pub fn font_index(&self) -> u16 {
        self.font_index
    }

    pub fn set_font_name(&mut self, name: &str) -> &mut Self {
        self.props.font_name = name.to_string();
        self
    }

    pub fn set_size(&mut self, size: f64) -> &mut Self {
        self.props.size = size;
        self
    }

    pub fn set_bold(&mut self, bold: bool) -> &mut Self {
        self.props.bold = bold;
        self
    }

    pub fn set_italic(&mut self) -> &mut Self {
        self.props.italic = true;
        self
    }

    pub fn set_underline(&mut self, underline: u8) -> &mut Self {
        self.props.underline = underline;
        self
    }

    pub fn set_strikeout(&mut self) -> &mut Self {
        self.props.strikeout = true;
        self
    }

    pub fn set_outline(&mut self) -> &mut Self {
        self.props.outline = true;
        self
    }

    pub fn set_shadow(&mut self) -> &mut Self {
        self.props.shadow = true;
        self
    }

    pub fn set_script(&mut self, script: u8) -> &mut Self {
        self.props.script = script;
        self
    }

    pub fn set_color(&mut self, color: impl Into<Color>) -> &mut Self {
        self.props.color = Some(color.into());
        self
    }

    pub fn set_num_format(&mut self, num_format: &str) -> &mut Self {
        self.props.num_format = Some(num_format.to_string());
        self
    }

    pub fn set_h_align(&mut self, align: HorizontalAlignment) -> &mut Self {
        self.props.align = align;
        self
    }

    pub fn set_v_align(&mut self, align: VerticalAlignment) -> &mut Self {
        self.props.valign = align;
        self
    }

    /// Set alignment by name. Horizontal names (`left`, `center`,
    /// `merge`, ...) and vertical names (`top`, `vcenter`, `vjustify`, ...)
    /// are both accepted; unknown names are ignored.
    pub fn set_align(&mut self, location: &str) -> &mut Self {
        let location = location.to_ascii_lowercase();
        let horizontal = match location.as_str() {
            "left" => Some(HorizontalAlignment::Left),
            "centre" | "center" => Some(HorizontalAlignment::Center),
            "right" => Some(HorizontalAlignment::Right),
            "fill" => Some(HorizontalAlignment::Fill),
            "justify" => Some(HorizontalAlignment::Justify),
            "merge" => Some(HorizontalAlignment::Merge),
            "equal_space" => Some(HorizontalAlignment::EqualSpace),
            _ => None,
        };
        let vertical = match location.as_str() {
            "top" => Some(VerticalAlignment::Top),
            "vcentre" | "vcenter" => Some(VerticalAlignment::Center),
            "bottom" => Some(VerticalAlignment::Bottom),
            "vjustify" => Some(VerticalAlignment::Justify),
            "vequal_space" => Some(VerticalAlignment::EqualSpace),
            _ => None,
        };
        if let Some(align) = horizontal {
            self.props.align = align;
        }
        if let Some(align) = vertical {
            self.props.valign = align;
        }
        self
    }

    /// Center across the selection
    pub fn set_merge(&mut self) -> &mut Self {
        self.props.align = HorizontalAlignment::Merge;
        self
    }

    pub fn set_text_wrap(&mut self) -> &mut Self {
        self.props.text_wrap = true;
        self
    }

    pub fn set_text_justlast(&mut self) -> &mut Self {
        self.props.text_justlast = true;
        self
    }

    pub fn set_rotation(&mut self, rotation: TextRotation) -> &mut Self {
        self.props.rotation = rotation;
        self
    }

    pub fn set_fg_color(&mut self, color: impl Into<Color>) -> &mut Self {
        self.props.fg_color = Some(color.into());
        if self.props.pattern == 0 {
            self.props.pattern = 1;
        }
        self
    }

    pub fn set_bg_color(&mut self, color: impl Into<Color>) -> &mut Self {
        self.props.bg_color = Some(color.into());
        if self.props.pattern == 0 {
            self.props.pattern = 1;
        }
        self
    }

    pub fn set_pattern(&mut self, pattern: u8) -> &mut Self {
        self.props.pattern = pattern;
        self
    }

    /// Same border style on all four sides
    pub fn set_border(&mut self, style: BorderStyle) -> &mut Self {
        self.props.bottom = style;
        self.props.top = style;
        self.props.left = style;
        self.props.right = style;
        self
    }

    pub fn set_border_color(&mut self, color: impl Into<Color>) -> &mut Self {
        let color = color.into();
        self.props.bottom_color = Some(color.clone());
        self.props.top_color = Some(color.clone());
        self.props.left_color = Some(color.clone());
        self.props.right_color = Some(color);
        self
    }

    pub fn set_bottom(&mut self, style: BorderStyle) -> &mut Self {
        self.props.bottom = style;
        self
    }

    pub fn set_top(&mut self, style: BorderStyle) -> &mut Self {
        self.props.top = style;
        self
    }

    pub fn set_left(&mut self, style: BorderStyle) -> &mut Self {
        self.props.left = style;
        self
    }

    pub fn set_right(&mut self, style: BorderStyle) -> &mut Self {
        self.props.right = style;
        self
    }

    pub fn set_locked(&mut self, locked: bool) -> &mut Self {
        self.props.locked = locked;
        self
    }

    pub fn set_hidden(&mut self, hidden: bool) -> &mut Self {
        self.props.hidden = hidden;
        self
    }

    fn font_height(&self) -> u16 {
        (self.props.size * 20.0).round().clamp(0.0, f64::from(u16::MAX)) as u16
    }

    fn font_weight(&self) -> u16 {
        if self.props.bold {
            FONT_WEIGHT_BOLD
        } else {
            FONT_WEIGHT_NORMAL
        }
    }

    fn font_color(&self) -> u16 {
        self.props
            .color
            .as_ref()
            .map_or(COLOR_AUTOMATIC, Color::index)
    }

    pub fn font_key(&self) -> FontKey {
        FontKey {
            name: self.props.font_name.replace(' ', "_"),
            height: self.font_height(),
            script: self.props.script,
            underline: self.props.underline,
            strikeout: self.props.strikeout,
            weight: self.font_weight(),
            outline: self.props.outline,
            family: self.props.family,
            charset: self.props.charset,
            shadow: self.props.shadow,
            color: self.font_color(),
            italic: self.props.italic,
        }
    }
}

fn cell_color(color: &Option<Color>, default: u16) -> u16 {
    color.as_ref().map_or(default, Color::index) & 0x7F
}

/// Border color, zeroed when the side has no border
fn border_color(style: BorderStyle, color: &Option<Color>) -> u16 {
    if style == BorderStyle::None {
        0
    } else {
        cell_color(color, COLOR_FG_DEFAULT)
    }
}

bitflags! {
    /// FONT record style bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FontStyle: u16 {
        const ITALIC = 0x0002;
        const STRIKEOUT = 0x0008;
        const OUTLINE = 0x0010;
        const SHADOW = 0x0020;
    }
}

bitflags! {
    /// XF attribute groups that differ from the parent style
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct XfUsed: u8 {
        const NUMBER = 0x04;
        const FONT = 0x08;
        const ALIGNMENT = 0x10;
        const BORDER = 0x20;
        const PATTERN = 0x40;
        const PROTECTION = 0x80;
    }
}

/// Write FONT record (0x0031)
pub fn write_font<W: Write>(writer: &mut W, version: BiffVersion, format: &Format) -> XlsResult<()> {
    let props = &format.props;

    let mut style = FontStyle::empty();
    style.set(FontStyle::ITALIC, props.italic);
    style.set(FontStyle::STRIKEOUT, props.strikeout);
    style.set(FontStyle::OUTLINE, props.outline);
    style.set(FontStyle::SHADOW, props.shadow);

    let (name_header, name_bytes): (Vec<u8>, Vec<u8>) = match version {
        BiffVersion::Biff5 => {
            let bytes = byte_string(&props.font_name);
            let len = bytes.len().min(u8::MAX as usize);
            (vec![len as u8], bytes[..len].to_vec())
        },
        BiffVersion::Biff8 => {
            let (flag, chars) = super::biff::biff8_chars(&props.font_name);
            let cch = super::biff::biff8_char_count(&props.font_name);
            (vec![cch as u8, flag], chars)
        },
    };

    let data_len = 14 + name_header.len() + name_bytes.len();
    write_record_header(writer, 0x0031, record_len(data_len)?)?;
    writer.write_all(&format.font_height().to_le_bytes())?;
    writer.write_all(&style.bits().to_le_bytes())?;
    writer.write_all(&format.font_color().to_le_bytes())?;
    writer.write_all(&format.font_weight().to_le_bytes())?;
    writer.write_all(&u16::from(props.script).to_le_bytes())?;
    writer.write_all(&[props.underline, props.family, props.charset, 0x00])?;
    writer.write_all(&name_header)?;
    writer.write_all(&name_bytes)?;
    Ok(())
}

/// Write XF (Extended Format) record (0x00E0)
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `version` - 16-byte BIFF5 or 20-byte BIFF8 layout
/// * `format` - Format with resolved font and number format indices
/// * `is_style_xf` - True for style XF, false for cell XF
pub fn write_xf<W: Write>(
    writer: &mut W,
    version: BiffVersion,
    format: &Format,
    is_style_xf: bool,
) -> XlsResult<()> {
    let props = &format.props;

    let style: u16 = if is_style_xf {
        0xFFF5
    } else {
        u16::from(props.locked) | (u16::from(props.hidden) << 1)
    };

    let fg_color = cell_color(&props.fg_color, COLOR_FG_DEFAULT);
    let bg_color = cell_color(&props.bg_color, COLOR_BG_DEFAULT);
    let has_border = [props.bottom, props.top, props.left, props.right]
        .iter()
        .any(|&side| side != BorderStyle::None);

    let mut used = XfUsed::empty();
    used.set(XfUsed::NUMBER, format.num_format_index != 0);
    used.set(XfUsed::FONT, format.font_index != 0);
    used.set(XfUsed::ALIGNMENT, props.text_wrap);
    used.set(XfUsed::BORDER, has_border);
    used.set(
        XfUsed::PATTERN,
        fg_color != COLOR_FG_DEFAULT || bg_color != COLOR_BG_DEFAULT || props.pattern != 0,
    );
    used.set(XfUsed::PROTECTION, props.locked || props.hidden);

    let bottom_color = border_color(props.bottom, &props.bottom_color);
    let top_color = border_color(props.top, &props.top_color);
    let left_color = border_color(props.left, &props.left_color);
    let right_color = border_color(props.right, &props.right_color);

    let mut align = props.align as u16;
    align |= u16::from(props.text_wrap) << 3;
    align |= (props.valign as u16) << 4;
    align |= u16::from(props.text_justlast) << 7;

    let icv = fg_color | (bg_color << 7);

    match version {
        BiffVersion::Biff5 => {
            align |= u16::from(props.rotation.code(version)) << 8;
            align |= u16::from(used.bits()) << 8;

            let fill = u16::from(props.pattern & 0x3F)
                | ((props.bottom as u16) << 6)
                | (bottom_color << 9);
            let border1 = (props.top as u16)
                | ((props.left as u16) << 3)
                | ((props.right as u16) << 6)
                | (top_color << 9);
            let border2 = left_color | (right_color << 7);

            write_record_header(writer, 0x00E0, 16)?;
            for value in [
                format.font_index,
                format.num_format_index,
                style,
                align,
                icv,
                fill,
                border1,
                border2,
            ] {
                writer.write_all(&value.to_le_bytes())?;
            }
        },
        BiffVersion::Biff8 => {
            let border1 = u32::from(props.left as u16)
                | (u32::from(props.right as u16) << 4)
                | (u32::from(props.top as u16) << 8)
                | (u32::from(props.bottom as u16) << 12)
                | (u32::from(left_color) << 16)
                | (u32::from(right_color) << 23);
            let border2 = u32::from(top_color)
                | (u32::from(bottom_color) << 7)
                | (u32::from(props.pattern & 0x3F) << 26);

            write_record_header(writer, 0x00E0, 20)?;
            writer.write_all(&format.font_index.to_le_bytes())?;
            writer.write_all(&format.num_format_index.to_le_bytes())?;
            writer.write_all(&style.to_le_bytes())?;
            writer.write_all(&[align as u8, props.rotation.code(version), 0x00, used.bits()])?;
            writer.write_all(&border1.to_le_bytes())?;
            writer.write_all(&border2.to_le_bytes())?;
            writer.write_all(&icv.to_le_bytes())?;
        },
    }
    Ok(())
}

/// The Excel 97 default colors for palette indices 8..=63
pub const DEFAULT_PALETTE: [[u8; 3]; 56] = [
    [0x00, 0x00, 0x00],
    [0xFF, 0xFF, 0xFF],
    [0xFF, 0x00, 0x00],
    [0x00, 0xFF, 0x00],
    [0x00, 0x00, 0xFF],
    [0xFF, 0xFF, 0x00],
    [0xFF, 0x00, 0xFF],
    [0x00, 0xFF, 0xFF],
    [0x80, 0x00, 0x00],
    [0x00, 0x80, 0x00],
    [0x00, 0x00, 0x80],
    [0x80, 0x80, 0x00],
    [0x80, 0x00, 0x80],
    [0x00, 0x80, 0x80],
    [0xC0, 0xC0, 0xC0],
    [0x80, 0x80, 0x80],
    [0x99, 0x99, 0xFF],
    [0x99, 0x33, 0x66],
    [0xFF, 0xFF, 0xCC],
    [0xCC, 0xFF, 0xFF],
    [0x66, 0x00, 0x66],
    [0xFF, 0x80, 0x80],
    [0x00, 0x66, 0xCC],
    [0xCC, 0xCC, 0xFF],
    [0x00, 0x00, 0x80],
    [0xFF, 0x00, 0xFF],
    [0xFF, 0xFF, 0x00],
    [0x00, 0xFF, 0xFF],
    [0x80, 0x00, 0x80],
    [0x80, 0x00, 0x00],
    [0x00, 0x80, 0x80],
    [0x00, 0x00, 0xFF],
    [0x00, 0xCC, 0xFF],
    [0xCC, 0xFF, 0xFF],
    [0xCC, 0xFF, 0xCC],
    [0xFF, 0xFF, 0x99],
    [0x99, 0xCC, 0xFF],
    [0xFF, 0x99, 0xCC],
    [0xCC, 0x99, 0xFF],
    [0xFF, 0xCC, 0x99],
    [0x33, 0x66, 0xFF],
    [0x33, 0xCC, 0xCC],
    [0x99, 0xCC, 0x00],
    [0xFF, 0xCC, 0x00],
    [0xFF, 0x99, 0x00],
    [0xFF, 0x66, 0x00],
    [0x66, 0x66, 0x99],
    [0x96, 0x96, 0x96],
    [0x00, 0x33, 0x66],
    [0x33, 0x99, 0x66],
    [0x00, 0x33, 0x00],
    [0x33, 0x33, 0x00],
    [0x99, 0x33, 0x00],
    [0x99, 0x33, 0x66],
    [0x33, 0x33, 0x99],
    [0x33, 0x33, 0x33],
];

/// Workbook color palette
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    pub fn new() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }

    /// Replace the color at `index` (8..=64) and return the index.
    /// Index 64 adds one entry past the default palette.
    pub fn set(&mut self, index: u32, red: u32, green: u32, blue: u32) -> XlsResult<u16> {
        if !(8..=64).contains(&index) {
            return Err(XlsError::ColorIndexOutOfRange(index));
        }
        for (component, value) in [('r', red), ('g', green), ('b', blue)] {
            if value > 255 {
                return Err(XlsError::ColorComponentOutOfRange { component, value });
            }
        }

        let slot = (index - 8) as usize;
        let rgb = [red as u8, green as u8, blue as u8];
        if slot < self.colors.len() {
            self.colors[slot] = rgb;
        } else {
            self.colors.push(rgb);
        }
        Ok(index as u16)
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

/// Formatting manager for tracking fonts and formats
#[derive(Debug)]
pub struct FormattingManager {
    version: BiffVersion,
    default_format: Format,
    formats: Vec<Format>,
    // Custom number formats (FORMAT records) in index order
    number_formats: Vec<(u16, String)>,
}

impl FormattingManager {
    pub fn new(version: BiffVersion) -> Self {
        Self {
            version,
            default_format: Format::new(0, FormatProperties::default()),
            formats: Vec::new(),
            number_formats: Vec::new(),
        }
    }

    /// Register a format and return its handle
    pub fn add_format(&mut self, props: FormatProperties) -> usize {
        let handle = self.formats.len();
        let xf_index = FIRST_USER_XF + handle as u16;
        self.formats.push(Format::new(xf_index, props));
        handle
    }

    pub fn format(&self, handle: usize) -> XlsResult<&Format> {
        self.formats.get(handle).ok_or(XlsError::FormatNotFound(handle))
    }

    pub fn format_mut(&mut self, handle: usize) -> XlsResult<&mut Format> {
        self.formats
            .get_mut(handle)
            .ok_or(XlsError::FormatNotFound(handle))
    }

    /// XF index for an optional format handle; `None` is the default
    /// cell XF
    pub fn xf_index(&self, handle: Option<usize>) -> XlsResult<u16> {
        match handle {
            Some(handle) => Ok(self.format(handle)?.xf_index),
            None => Ok(FIRST_USER_XF - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Write all FONT records and assign each format its font index.
    ///
    /// The default font fills indices 0..=3 and 5 (there is no font 4).
    /// User fonts start at 6; formats whose font matches the default
    /// share font 0.
    pub fn write_fonts<W: Write>(&mut self, writer: &mut W) -> XlsResult<()> {
        for _ in 0..5 {
            write_font(writer, self.version, &self.default_format)?;
        }

        let mut fonts: HashMap<FontKey, u16> = HashMap::new();
        fonts.insert(self.default_format.font_key(), 0);
        let mut next = 6u16;

        for format in &mut self.formats {
            let key = format.font_key();
            if let Some(&index) = fonts.get(&key) {
                format.font_index = index;
            } else {
                fonts.insert(key, next);
                format.font_index = next;
                next += 1;
                write_font(writer, self.version, format)?;
            }
        }

        debug!("wrote {} unique user fonts", next - 6);
        Ok(())
    }

    /// Write FORMAT records for custom number formats and assign each
    /// format its number format index
    pub fn write_number_formats<W: Write>(&mut self, writer: &mut W) -> XlsResult<()> {
        let mut seen: HashMap<String, u16> = HashMap::new();
        self.number_formats.clear();
        let mut next = FIRST_USER_DEFINED_NUMBER_FORMAT_INDEX;

        for format in &mut self.formats {
            let Some(pattern) = format.props.num_format.as_deref() else {
                format.num_format_index = 0;
                continue;
            };
            if let Some(index) = builtin_number_format(pattern) {
                format.num_format_index = index;
                continue;
            }
            if let Some(&index) = seen.get(pattern) {
                format.num_format_index = index;
                continue;
            }
            seen.insert(pattern.to_string(), next);
            self.number_formats.push((next, pattern.to_string()));
            format.num_format_index = next;
            next += 1;
        }

        for (code, pattern) in &self.number_formats {
            write_format_record(writer, self.version, *code, pattern)?;
        }
        Ok(())
    }

    /// Write all XF records: 15 style XFs, the default cell XF, then one
    /// cell XF per registered format
    pub fn write_xfs<W: Write>(&self, writer: &mut W) -> XlsResult<()> {
        for _ in 0..15 {
            write_xf(writer, self.version, &self.default_format, true)?;
        }
        write_xf(writer, self.version, &self.default_format, false)?;

        for format in &self.formats {
            write_xf(writer, self.version, format, false)?;
        }
        Ok(())
    }

    /// Custom number formats written by the last call to
    /// [`write_number_formats`](Self::write_number_formats)
    pub fn number_formats(&self) -> &[(u16, String)] {
        &self.number_formats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_records(data: &[u8], record_type: u16) -> usize {
        let mut count = 0;
        let mut pos = 0;
        while pos + 4 <= data.len() {
            let rt = u16::from_le_bytes([data[pos], data[pos + 1]]);
            let len = u16::from_le_bytes([data[pos + 2], data[pos + 3]]) as usize;
            if rt == record_type {
                count += 1;
            }
            pos += 4 + len;
        }
        count
    }

    #[test]
    fn test_builtin_number_format() {
        assert_eq!(builtin_number_format("0"), Some(0));
        assert_eq!(builtin_number_format("14"), Some(14));
        assert_eq!(builtin_number_format("00"), None);
        assert_eq!(builtin_number_format("007"), None);
        assert_eq!(builtin_number_format("0.00"), Some(2));
        assert_eq!(builtin_number_format("0.000"), None);
    }

    #[test]
    fn test_color_index() {
        assert_eq!(Color::from("blue").index(), 0x0C);
        assert_eq!(Color::from("Red").index(), 0x0A);
        assert_eq!(Color::from("chartreuse").index(), COLOR_AUTOMATIC);
        assert_eq!(Color::from(20).index(), 20);
        assert_eq!(Color::from(70).index(), COLOR_AUTOMATIC);
    }

    #[test]
    fn test_font_dedup() {
        let mut mgr = FormattingManager::new(BiffVersion::Biff8);
        let bold = FormatProperties {
            bold: true,
            ..Default::default()
        };
        let a = mgr.add_format(bold.clone());
        let b = mgr.add_format(FormatProperties {
            num_format: Some("0.000".into()),
            ..bold
        });
        let plain = mgr.add_format(FormatProperties::default());

        let mut buf = Vec::new();
        mgr.write_fonts(&mut buf).unwrap();
        assert_eq!(count_records(&buf, 0x0031), 5 + 1);
        assert_eq!(mgr.format(a).unwrap().font_index(), 6);
        assert_eq!(mgr.format(b).unwrap().font_index(), 6);
        assert_eq!(mgr.format(plain).unwrap().font_index(), 0);

        let mut buf = Vec::new();
        mgr.write_xfs(&mut buf).unwrap();
        assert_eq!(count_records(&buf, 0x00E0), 16 + 3);
    }

    #[test]
    fn test_number_format_dedup() {
        let mut mgr = FormattingManager::new(BiffVersion::Biff5);
        for _ in 0..2 {
            mgr.add_format(FormatProperties {
                num_format: Some("0.000".into()),
                ..Default::default()
            });
        }
        mgr.add_format(FormatProperties {
            num_format: Some("14".into()),
            ..Default::default()
        });

        let mut buf = Vec::new();
        mgr.write_number_formats(&mut buf).unwrap();
        assert_eq!(count_records(&buf, 0x041E), 1);
        assert_eq!(mgr.number_formats(), &[(164, "0.000".to_string())]);
        assert_eq!(mgr.format(0).unwrap().num_format_index, 164);
        assert_eq!(mgr.format(1).unwrap().num_format_index, 164);
        assert_eq!(mgr.format(2).unwrap().num_format_index, 14);
    }

    #[test]
    fn test_xf_layout_biff5() {
        let mut format = Format::new(
            16,
            FormatProperties {
                text_wrap: true,
                align: HorizontalAlignment::Center,
                ..Default::default()
            },
        );
        format.set_fg_color("red");
        assert_eq!(format.properties().pattern, 1);

        let mut buf = Vec::new();
        write_xf(&mut buf, BiffVersion::Biff5, &format, false).unwrap();
        assert_eq!(buf.len(), 20);
        let align = u16::from_le_bytes([buf[10], buf[11]]);
        assert_eq!(align & 0x07, 2);
        assert_ne!(align & 0x08, 0);
        assert_eq!((align >> 4) & 0x07, 2);
        // Alignment and pattern attributes used
        assert_ne!(align & (1 << 12), 0);
        assert_ne!(align & (1 << 14), 0);
        let icv = u16::from_le_bytes([buf[12], buf[13]]);
        assert_eq!(icv & 0x7F, 0x0A);
        assert_eq!(icv >> 7, 0x41);
    }

    #[test]
    fn test_xf_layout_biff8() {
        let mut format = Format::new(17, FormatProperties::default());
        format
            .set_border(BorderStyle::Thin)
            .set_rotation(TextRotation::Up);

        let mut buf = Vec::new();
        write_xf(&mut buf, BiffVersion::Biff8, &format, false).unwrap();
        assert_eq!(buf.len(), 24);
        assert_eq!(buf[11], 180);
        // Border attribute used
        assert_ne!(buf[13] & 0x20, 0);
        let border1 = u32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);
        assert_eq!(border1 & 0xFFFF, 0x1111);
        assert_eq!((border1 >> 16) & 0x7F, 0x40);

        let mut style = Vec::new();
        write_xf(&mut style, BiffVersion::Biff8, &format, true).unwrap();
        assert_eq!(&style[8..10], &[0xF5, 0xFF]);
    }

    #[test]
    fn test_font_record_sizes() {
        let format = Format::new(16, FormatProperties::default());
        let mut buf = Vec::new();
        write_font(&mut buf, BiffVersion::Biff5, &format).unwrap();
        assert_eq!(buf.len(), 4 + 15 + 5);
        assert_eq!(&buf[4..6], &200u16.to_le_bytes());
        assert_eq!(&buf[10..12], &400u16.to_le_bytes());

        let mut buf = Vec::new();
        write_font(&mut buf, BiffVersion::Biff8, &format).unwrap();
        assert_eq!(buf.len(), 4 + 16 + 5);
    }

    #[test]
    fn test_font_setters() {
        let mut format = Format::new(16, FormatProperties::default());
        format
            .set_font_name("Times New Roman")
            .set_size(12.0)
            .set_bold(true)
            .set_italic()
            .set_strikeout()
            .set_outline()
            .set_shadow()
            .set_underline(1)
            .set_script(1)
            .set_color("red");

        let mut buf = Vec::new();
        write_font(&mut buf, BiffVersion::Biff8, &format).unwrap();
        assert_eq!(&buf[4..6], &240u16.to_le_bytes());
        let style = FontStyle::from_bits_truncate(u16::from_le_bytes([buf[6], buf[7]]));
        assert_eq!(style, FontStyle::all());
        assert_eq!(&buf[8..10], &0x0Au16.to_le_bytes());
        assert_eq!(&buf[10..12], &FONT_WEIGHT_BOLD.to_le_bytes());
        assert_eq!(&buf[12..14], &[1, 0]);
        assert_eq!(buf[14], 1);
        assert_eq!(&buf[18..20], &[15, 0x00]);
        assert_eq!(&buf[20..], b"Times New Roman");
    }

    #[test]
    fn test_alignment_border_and_protection_setters() {
        let mut format = Format::new(16, FormatProperties::default());
        format
            .set_align("vcenter")
            .set_align("right")
            .set_align("nowhere")
            .set_text_justlast()
            .set_locked(true)
            .set_hidden(true)
            .set_bottom(BorderStyle::Thick)
            .set_border_color("blue")
            .set_pattern(2)
            .set_bg_color("yellow");

        let mut buf = Vec::new();
        write_xf(&mut buf, BiffVersion::Biff8, &format, false).unwrap();
        assert_eq!(&buf[8..10], &[0x03, 0x00]);
        assert_eq!(buf[10], 0x03 | 0x10 | 0x80);
        let used = XfUsed::from_bits_truncate(buf[13]);
        assert_eq!(used, XfUsed::BORDER | XfUsed::PATTERN | XfUsed::PROTECTION);
        let border1 = u32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);
        assert_eq!(border1, 0x5000);
        let border2 = u32::from_le_bytes([buf[18], buf[19], buf[20], buf[21]]);
        assert_eq!(border2, (0x0C << 7) | (2 << 26));
        assert_eq!(&buf[22..24], &(0x40u16 | (0x0D << 7)).to_le_bytes());

        format
            .set_merge()
            .set_v_align(VerticalAlignment::Top)
            .set_top(BorderStyle::Thin)
            .set_left(BorderStyle::Thin)
            .set_right(BorderStyle::Thin)
            .set_text_wrap();
        let props = format.properties();
        assert_eq!(props.align, HorizontalAlignment::Merge);
        assert_eq!(props.valign, VerticalAlignment::Top);
        assert!(props.text_wrap);

        let mut format = Format::new(17, FormatProperties::default());
        format.set_h_align(HorizontalAlignment::Fill).set_num_format("0.0%");
        assert_eq!(format.properties().align, HorizontalAlignment::Fill);
        assert_eq!(format.properties().num_format.as_deref(), Some("0.0%"));
    }

    #[test]
    fn test_palette_bounds() {
        let mut palette = Palette::new();
        assert_eq!(palette.set(8, 1, 2, 3).unwrap(), 8);
        assert_eq!(palette.colors()[0], [1, 2, 3]);
        assert_eq!(palette.set(64, 0, 0, 0).unwrap(), 64);
        assert_eq!(palette.colors().len(), 57);
        assert!(matches!(
            palette.set(7, 0, 0, 0),
            Err(XlsError::ColorIndexOutOfRange(7))
        ));
        assert!(matches!(
            palette.set(10, 0, 256, 0),
            Err(XlsError::ColorComponentOutOfRange { component: 'g', value: 256 })
        ));
    }
}
