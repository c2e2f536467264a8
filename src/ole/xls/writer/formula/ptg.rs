//! Parsed tokens (ptgs) and their BIFF5/BIFF8 encodings
//!
//! The parse tree is flattened into reverse polish order: operands first,
//! then the operator. Function calls emit their arguments and then the
//! function token carrying the index (and argument count for functions
//! with a variable number of arguments).

use smallvec::SmallVec;

use crate::ole::xls::FormulaError;

use super::super::biff::{BiffVersion, biff8_char_count, biff8_chars, byte_string};
use super::lexer::MAX_STRING_LEN;
use super::super::cell_ref::CellRef;
use super::functions::Arity;
use super::parser::{BinaryOp, Expr, SheetSpan};

pub const PTG_ADD: u8 = 0x03;
pub const PTG_SUB: u8 = 0x04;
pub const PTG_MUL: u8 = 0x05;
pub const PTG_DIV: u8 = 0x06;
pub const PTG_CONCAT: u8 = 0x08;
pub const PTG_LT: u8 = 0x09;
pub const PTG_LE: u8 = 0x0A;
pub const PTG_EQ: u8 = 0x0B;
pub const PTG_GE: u8 = 0x0C;
pub const PTG_GT: u8 = 0x0D;
pub const PTG_NE: u8 = 0x0E;
pub const PTG_UMINUS: u8 = 0x13;
pub const PTG_PAREN: u8 = 0x15;
pub const PTG_STR: u8 = 0x17;
pub const PTG_ATTR: u8 = 0x19;
pub const PTG_INT: u8 = 0x1E;
pub const PTG_NUM: u8 = 0x1F;
pub const PTG_AREA: u8 = 0x25;
pub const PTG_MEM_FUNC: u8 = 0x29;
pub const PTG_UNION: u8 = 0x10;
pub const PTG_AREA_3D: u8 = 0x3B;
pub const PTG_FUNC_V: u8 = 0x41;
pub const PTG_FUNC_VAR_V: u8 = 0x42;
pub const PTG_REF_A: u8 = 0x64;

/// `tAttr` option flagging a formula that must be recalculated on every change
pub const ATTR_VOLATILE: u8 = 0x01;
pub const PTG_REF_3D_A: u8 = 0x7A;
pub const PTG_AREA_3D_A: u8 = 0x7B;

/// One parsed token with sheet names already resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Ptg {
    Int(u16),
    Num(f64),
    Str(String),
    Ref(CellRef),
    Area(CellRef, CellRef),
    Ref3d {
        first_sheet: u16,
        last_sheet: u16,
        cell: CellRef,
    },
    Area3d {
        first_sheet: u16,
        last_sheet: u16,
        first: CellRef,
        last: CellRef,
    },
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
    Uminus,
    Paren,
    /// `tAttrVolatile`, always the first token
    AttrVolatile,
    Func {
        index: u16,
    },
    FuncVar {
        index: u16,
        argc: u8,
    },
}

pub type PtgList = SmallVec<[Ptg; 8]>;

/// BIFF8 XTI table: each 3-D reference points at an entry of
/// (supporting book, first sheet, last sheet). Only the internal
/// supporting book (index 0) is used.
#[derive(Debug, Clone, Default)]
pub struct ExternSheets {
    entries: Vec<(u16, u16)>,
}

impl ExternSheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the (first, last) sheet pair, added on first use
    pub fn index_of(&mut self, first_sheet: u16, last_sheet: u16) -> u16 {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|&entry| entry == (first_sheet, last_sheet))
        {
            return pos as u16;
        }
        self.entries.push((first_sheet, last_sheet));
        (self.entries.len() - 1) as u16
    }

    pub fn entries(&self) -> &[(u16, u16)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten a parse tree into reverse polish order.
///
/// `sheet_index` resolves a sheet name to its position in the workbook.
pub fn flatten<F>(expr: &Expr, sheet_index: &F, out: &mut PtgList) -> Result<(), FormulaError>
where
    F: Fn(&str) -> Option<u16>,
{
    match expr {
        Expr::Number(text) => out.push(number(text)?),
        Expr::Str(text) => out.push(Ptg::Str(text.clone())),
        Expr::Ref(cell) => out.push(Ptg::Ref(*cell)),
        Expr::Area(first, last) => out.push(Ptg::Area(*first, *last)),
        Expr::Ref3d { sheets, cell } => {
            let (first_sheet, last_sheet) = resolve_sheets(sheets, sheet_index)?;
            out.push(Ptg::Ref3d {
                first_sheet,
                last_sheet,
                cell: *cell,
            });
        },
        Expr::Area3d {
            sheets,
            first,
            last,
        } => {
            let (first_sheet, last_sheet) = resolve_sheets(sheets, sheet_index)?;
            out.push(Ptg::Area3d {
                first_sheet,
                last_sheet,
                first: *first,
                last: *last,
            });
        },
        Expr::Negate(inner) => {
            flatten(inner, sheet_index, out)?;
            out.push(Ptg::Uminus);
        },
        Expr::Paren(inner) => {
            flatten(inner, sheet_index, out)?;
            out.push(Ptg::Paren);
        },
        Expr::Binary { op, left, right } => {
            flatten(left, sheet_index, out)?;
            flatten(right, sheet_index, out)?;
            out.push(match op {
                BinaryOp::Add => Ptg::Add,
                BinaryOp::Sub => Ptg::Sub,
                BinaryOp::Mul => Ptg::Mul,
                BinaryOp::Div => Ptg::Div,
                BinaryOp::Concat => Ptg::Concat,
                BinaryOp::Lt => Ptg::Lt,
                BinaryOp::Le => Ptg::Le,
                BinaryOp::Eq => Ptg::Eq,
                BinaryOp::Ge => Ptg::Ge,
                BinaryOp::Gt => Ptg::Gt,
                BinaryOp::Ne => Ptg::Ne,
            });
        },
        Expr::Call { spec, args, .. } => {
            for arg in args {
                flatten(arg, sheet_index, out)?;
            }
            if spec.volatile && out.first() != Some(&Ptg::AttrVolatile) {
                out.insert(0, Ptg::AttrVolatile);
            }
            out.push(match spec.arity {
                Arity::Fixed(_) => Ptg::Func { index: spec.index },
                Arity::Variable => Ptg::FuncVar {
                    index: spec.index,
                    argc: args.len() as u8,
                },
            });
        },
    }
    Ok(())
}

/// Integers in 0..=65535 written without a fraction use `tInt`.
fn number(text: &str) -> Result<Ptg, FormulaError> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = text.parse::<u16>() {
            return Ok(Ptg::Int(value));
        }
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Ptg::Num(value)),
        _ => Err(FormulaError::InvalidNumber(text.to_string())),
    }
}

fn resolve_sheets<F>(sheets: &SheetSpan, sheet_index: &F) -> Result<(u16, u16), FormulaError>
where
    F: Fn(&str) -> Option<u16>,
{
    let lookup = |name: &str| {
        sheet_index(name).ok_or_else(|| FormulaError::UnknownSheet(name.to_string()))
    };
    let first = lookup(&sheets.first)?;
    let last = match &sheets.last {
        Some(name) => lookup(name)?,
        None => first,
    };
    Ok((first.min(last), first.max(last)))
}

/// Encode tokens for `version`, registering BIFF8 XTI entries as needed.
pub fn encode(
    tokens: &[Ptg],
    version: BiffVersion,
    externs: &mut ExternSheets,
) -> Result<Vec<u8>, FormulaError> {
    let mut out = Vec::with_capacity(tokens.len() * 4);
    for token in tokens {
        match token {
            Ptg::Int(value) => {
                out.push(PTG_INT);
                out.extend_from_slice(&value.to_le_bytes());
            },
            Ptg::Num(value) => {
                out.push(PTG_NUM);
                out.extend_from_slice(&value.to_le_bytes());
            },
            Ptg::Str(text) => encode_str(&mut out, text, version)?,
            Ptg::Ref(cell) => {
                out.push(PTG_REF_A);
                encode_cell(&mut out, cell, version);
            },
            Ptg::Area(first, last) => {
                out.push(PTG_AREA);
                encode_area(&mut out, first, last, version);
            },
            Ptg::Ref3d {
                first_sheet,
                last_sheet,
                cell,
            } => {
                out.push(PTG_REF_3D_A);
                encode_ext_ref(&mut out, *first_sheet, *last_sheet, version, externs);
                encode_cell(&mut out, cell, version);
            },
            Ptg::Area3d {
                first_sheet,
                last_sheet,
                first,
                last,
            } => {
                out.push(PTG_AREA_3D_A);
                encode_ext_ref(&mut out, *first_sheet, *last_sheet, version, externs);
                encode_area(&mut out, first, last, version);
            },
            Ptg::Add => out.push(PTG_ADD),
            Ptg::Sub => out.push(PTG_SUB),
            Ptg::Mul => out.push(PTG_MUL),
            Ptg::Div => out.push(PTG_DIV),
            Ptg::Concat => out.push(PTG_CONCAT),
            Ptg::Lt => out.push(PTG_LT),
            Ptg::Le => out.push(PTG_LE),
            Ptg::Eq => out.push(PTG_EQ),
            Ptg::Ge => out.push(PTG_GE),
            Ptg::Gt => out.push(PTG_GT),
            Ptg::Ne => out.push(PTG_NE),
            Ptg::Uminus => out.push(PTG_UMINUS),
            Ptg::Paren => out.push(PTG_PAREN),
            Ptg::AttrVolatile => out.extend_from_slice(&[PTG_ATTR, ATTR_VOLATILE, 0, 0]),
            Ptg::Func { index } => {
                out.push(PTG_FUNC_V);
                out.extend_from_slice(&index.to_le_bytes());
            },
            Ptg::FuncVar { index, argc } => {
                out.push(PTG_FUNC_VAR_V);
                out.push(*argc);
                out.extend_from_slice(&index.to_le_bytes());
            },
        }
    }
    Ok(out)
}

/// The length byte counts encoded characters: bytes for BIFF5, UTF-16
/// units for BIFF8.
fn encode_str(out: &mut Vec<u8>, text: &str, version: BiffVersion) -> Result<(), FormulaError> {
    out.push(PTG_STR);
    match version {
        BiffVersion::Biff5 => {
            let bytes = byte_string(text);
            let len = u8::try_from(bytes.len())
                .map_err(|_| FormulaError::StringTooLong(bytes.len()))?;
            out.push(len);
            out.extend_from_slice(&bytes);
        },
        BiffVersion::Biff8 => {
            let count = biff8_char_count(text);
            if count > MAX_STRING_LEN {
                return Err(FormulaError::StringTooLong(count));
            }
            let (flag, chars) = biff8_chars(text);
            out.extend_from_slice(&[count as u8, flag]);
            out.extend_from_slice(&chars);
        },
    }
    Ok(())
}

/// Packed (row, col) pair with relative flags
fn packed_cell(cell: &CellRef, version: BiffVersion) -> (u16, u16) {
    let row = cell.row as u16;
    let col = cell.col as u16;
    let flags = (u16::from(cell.col_relative) << 14) | (u16::from(cell.row_relative) << 15);
    match version {
        BiffVersion::Biff5 => (row | flags, col),
        BiffVersion::Biff8 => (row, col | flags),
    }
}

fn encode_cell(out: &mut Vec<u8>, cell: &CellRef, version: BiffVersion) {
    let (row, col) = packed_cell(cell, version);
    out.extend_from_slice(&row.to_le_bytes());
    match version {
        BiffVersion::Biff5 => out.push(col as u8),
        BiffVersion::Biff8 => out.extend_from_slice(&col.to_le_bytes()),
    }
}

fn encode_area(out: &mut Vec<u8>, first: &CellRef, last: &CellRef, version: BiffVersion) {
    let (row1, col1) = packed_cell(first, version);
    let (row2, col2) = packed_cell(last, version);
    out.extend_from_slice(&row1.to_le_bytes());
    out.extend_from_slice(&row2.to_le_bytes());
    match version {
        BiffVersion::Biff5 => {
            out.push(col1 as u8);
            out.push(col2 as u8);
        },
        BiffVersion::Biff8 => {
            out.extend_from_slice(&col1.to_le_bytes());
            out.extend_from_slice(&col2.to_le_bytes());
        },
    }
}

/// BIFF5: sheet offset relative to 0xFFFF, 8 reserved bytes, sheet pair.
/// BIFF8: index into the XTI table.
fn encode_ext_ref(
    out: &mut Vec<u8>,
    first_sheet: u16,
    last_sheet: u16,
    version: BiffVersion,
    externs: &mut ExternSheets,
) {
    match version {
        BiffVersion::Biff5 => {
            let offset = (-1i32 - i32::from(first_sheet)) as i16;
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&0f64.to_le_bytes());
            out.extend_from_slice(&first_sheet.to_le_bytes());
            out.extend_from_slice(&last_sheet.to_le_bytes());
        },
        BiffVersion::Biff8 => {
            let index = externs.index_of(first_sheet, last_sheet);
            out.extend_from_slice(&index.to_le_bytes());
        },
    }
}
