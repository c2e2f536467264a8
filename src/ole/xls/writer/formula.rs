//! Formula compilation
//!
//! Converts formula text such as `SUM(A1:A2)*2` into the parsed-token
//! (ptg) byte stream stored in FORMULA records. Compilation runs in three
//! steps:
//!
//! - **Lexing**: the text is split into literals, references, operators
//!   and function names
//! - **Parsing**: a recursive descent parser builds an expression tree
//! - **Flattening**: the tree is emitted in reverse polish order and
//!   encoded for the target BIFF version
//!
//! # Example
//!
//! ```text
//! Formula: A1+B1*2
//! Tokens:  [tRefA(A1), tRefA(B1), tInt(2), tMul, tAdd]
//! ```
//!
//! 3-D references (`Sheet2!A1`) need the sheet to be registered with the
//! compiler first; the workbook does this as worksheets are added.

use std::collections::HashMap;

use super::super::FormulaError;
use super::biff::BiffVersion;

/// Built-in worksheet function table
pub mod functions;

/// Formula tokenizer
mod lexer;

/// Recursive descent parser
mod parser;

/// Parsed tokens and encoding
pub mod ptg;

pub use functions::{Arity, FunctionSpec};
pub use parser::Expr;
pub use ptg::{ExternSheets, Ptg, PtgList};

/// Workbook-wide formula compiler
///
/// Holds the sheet name table used to resolve 3-D references and, for
/// BIFF8, the XTI table those references point into.
#[derive(Debug, Clone)]
pub struct FormulaCompiler {
    version: BiffVersion,
    sheets: HashMap<String, u16>,
    externs: ExternSheets,
}

impl FormulaCompiler {
    pub fn new(version: BiffVersion) -> Self {
        Self {
            version,
            sheets: HashMap::new(),
            externs: ExternSheets::new(),
        }
    }

    pub fn version(&self) -> BiffVersion {
        self.version
    }

    /// Make `name` resolvable in 3-D references
    pub fn register_sheet(&mut self, name: &str, index: u16) {
        self.sheets.insert(name.to_string(), index);
    }

    pub fn sheet_index(&self, name: &str) -> Option<u16> {
        self.sheets.get(name).copied()
    }

    pub fn externs(&self) -> &ExternSheets {
        &self.externs
    }

    pub fn externs_mut(&mut self) -> &mut ExternSheets {
        &mut self.externs
    }

    /// Parse formula text (without a leading `=`) into an expression tree
    pub fn parse(&self, formula: &str) -> Result<Expr, FormulaError> {
        let tokens = lexer::Lexer::new(formula).tokenize()?;
        parser::Parser::new(tokens).parse()
    }

    /// Parse and flatten into reverse polish order
    pub fn tokens(&self, formula: &str) -> Result<PtgList, FormulaError> {
        let expr = self.parse(formula)?;
        let mut out = PtgList::new();
        ptg::flatten(&expr, &|name: &str| self.sheet_index(name), &mut out)?;
        Ok(out)
    }

    /// Compile formula text to the encoded token stream (`rgce`)
    pub fn compile(&mut self, formula: &str) -> Result<Vec<u8>, FormulaError> {
        let tokens = self.tokens(formula)?;
        // XTI entries are only kept when the whole formula encodes
        let mut externs = self.externs.clone();
        let rgce = ptg::encode(&tokens, self.version, &mut externs)?;
        self.externs = externs;
        Ok(rgce)
    }
}
