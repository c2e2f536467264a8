//! Recursive descent formula parser
//!
//! ```text
//! condition  := expression (('<' | '>' | '<=' | '>=' | '=' | '<>' | '&') expression)*
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := '(' condition ')' | '-' factor | number | string
//!             | reference | range | function '(' [condition ((',' | ';') condition)*] ')'
//! ```
//!
//! All binary operators are left associative.

use crate::ole::xls::FormulaError;

use super::super::cell_ref::CellRef;
use super::functions::{self, Arity, FunctionSpec};
use super::lexer::{Spanned, Token, TokenList};

/// Last valid row and column of a sheet
pub const MAX_ROW: u32 = 65_535;
pub const MAX_COL: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
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
}

/// Sheet part of a 3-D reference, names as written
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpan {
    pub first: String,
    pub last: Option<String>,
}

impl SheetSpan {
    fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((first, last)) => Self {
                first: first.to_string(),
                last: Some(last.to_string()),
            },
            None => Self {
                first: text.to_string(),
                last: None,
            },
        }
    }
}

/// Parse tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal as written, so that small integers can use `tInt`
    Number(String),
    Str(String),
    Ref(CellRef),
    Area(CellRef, CellRef),
    Ref3d {
        sheets: SheetSpan,
        cell: CellRef,
    },
    Area3d {
        sheets: SheetSpan,
        first: CellRef,
        last: CellRef,
    },
    Negate(Box<Expr>),
    Paren(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        spec: &'static FunctionSpec,
        args: Vec<Expr>,
    },
}

/// Parser state: the token list and a cursor into it
pub struct Parser {
    tokens: TokenList,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: TokenList) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete formula; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, FormulaError> {
        if self.tokens.is_empty() {
            return Err(FormulaError::EmptyFormula);
        }
        let expr = self.condition()?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(unexpected(extra));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn condition(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.expression()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Concat) => BinaryOp::Concat,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.expression()?;
            left = binary(op, left, right);
        }
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.factor()?;
            left = binary(op, left, right);
        }
    }

    fn factor(&mut self) -> Result<Expr, FormulaError> {
        let Some(spanned) = self.advance() else {
            return Err(FormulaError::UnexpectedToken {
                token: String::new(),
                position: self.end_position(),
            });
        };

        let Spanned { token, position } = spanned;
        match token {
            Token::LParen => {
                let inner = self.condition()?;
                match self.advance() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(Expr::Paren(Box::new(inner))),
                    Some(other) => Err(unexpected(&other)),
                    None => Err(FormulaError::MissingCloseParen),
                }
            },
            Token::Minus => Ok(Expr::Negate(Box::new(self.factor()?))),
            Token::Number(text) => Ok(Expr::Number(text)),
            Token::Str(text) => Ok(Expr::Str(text)),
            Token::Ref(text) => Ok(Expr::Ref(cell(&text)?)),
            Token::Range(first, last) => Ok(Expr::Area(cell(&first)?, cell(&last)?)),
            Token::Ref3d { sheets, cell: text } => Ok(Expr::Ref3d {
                sheets: SheetSpan::parse(&sheets),
                cell: cell(&text)?,
            }),
            Token::Range3d {
                sheets,
                first,
                last,
            } => {
                let (first, last) = range_bounds(&first, &last)?;
                Ok(Expr::Area3d {
                    sheets: SheetSpan::parse(&sheets),
                    first,
                    last,
                })
            },
            Token::Func(name) => self.function(name),
            other => Err(FormulaError::UnexpectedToken {
                token: other.describe(),
                position,
            }),
        }
    }

    fn function(&mut self, name: String) -> Result<Expr, FormulaError> {
        let name = name.to_ascii_uppercase();
        let spec =
            functions::lookup(&name).ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;

        // The lexer only emits a function name when '(' follows it.
        self.pos += 1;

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                if self.peek().is_none() {
                    return Err(FormulaError::MissingCloseParen);
                }
                args.push(self.condition()?);
                match self.peek() {
                    Some(Token::Comma | Token::Semicolon) => self.pos += 1,
                    Some(Token::RParen) => {
                        self.pos += 1;
                        break;
                    },
                    Some(_) => {
                        return Err(FormulaError::MissingComma {
                            function: name,
                            argument: args.len(),
                        });
                    },
                    None => return Err(FormulaError::MissingCloseParen),
                }
            }
        }

        match spec.arity {
            Arity::Fixed(expected) if usize::from(expected) != args.len() => {
                Err(FormulaError::ArgumentCount {
                    function: name,
                    expected: usize::from(expected),
                    found: args.len(),
                })
            },
            Arity::Variable if args.len() > usize::from(u8::MAX) => {
                Err(FormulaError::ArgumentCount {
                    function: name,
                    expected: usize::from(u8::MAX),
                    found: args.len(),
                })
            },
            _ => Ok(Expr::Call { name, spec, args }),
        }
    }

    fn end_position(&self) -> usize {
        self.tokens
            .last()
            .map(|s| s.position + s.token.describe().chars().count())
            .unwrap_or(0)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unexpected(spanned: &Spanned) -> FormulaError {
    FormulaError::UnexpectedToken {
        token: spanned.token.describe(),
        position: spanned.position,
    }
}

/// Parse and range-check a cell reference
fn cell(text: &str) -> Result<CellRef, FormulaError> {
    let parsed = CellRef::parse(text)
        .ok_or_else(|| FormulaError::UnexpectedToken {
            token: text.to_string(),
            position: 0,
        })?;
    if parsed.col > MAX_COL {
        return Err(FormulaError::ColumnOutOfRange(text.to_string()));
    }
    if parsed.row > MAX_ROW {
        return Err(FormulaError::RowOutOfRange(text.to_string()));
    }
    Ok(parsed)
}

/// Row number of a whole-row reference such as `3` or `$3`
fn whole_row(text: &str) -> Result<CellRef, FormulaError> {
    let (digits, row_relative) = match text.strip_prefix('$') {
        Some(rest) => (rest, false),
        None => (text, true),
    };
    let row = digits
        .parse::<u32>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|&row| row <= MAX_ROW)
        .ok_or_else(|| FormulaError::RowOutOfRange(text.to_string()))?;
    Ok(CellRef {
        row,
        col: 0,
        row_relative,
        col_relative: false,
    })
}

/// Both ends of a 3-D range; a pair of row numbers spans every column
fn range_bounds(first: &str, last: &str) -> Result<(CellRef, CellRef), FormulaError> {
    if CellRef::parse(first).is_some() {
        return Ok((cell(first)?, cell(last)?));
    }
    let first = whole_row(first)?;
    let mut last = whole_row(last)?;
    last.col = MAX_COL;
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn parse(formula: &str) -> Result<Expr, FormulaError> {
        Parser::new(Lexer::new(formula).tokenize()?).parse()
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1+2*3").unwrap();
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary node");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_left_associative_comparisons() {
        let expr = parse("1<2=3").unwrap();
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected binary node");
        };
        assert_eq!(op, BinaryOp::Eq);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn test_unary_minus_binds_to_factor() {
        let expr = parse("-A1*2").unwrap();
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected binary node");
        };
        assert_eq!(op, BinaryOp::Mul);
        assert!(matches!(*left, Expr::Negate(_)));
    }

    #[test]
    fn test_function_arguments() {
        let expr = parse("IF(A1>0;\"yes\",\"no\")").unwrap();
        let Expr::Call { name, args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "IF");
        assert_eq!(args.len(), 3);

        let Expr::Call { args, .. } = parse("pi()").unwrap() else {
            panic!("expected call");
        };
        assert!(args.is_empty());
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(
            parse("NOSUCH(1)"),
            Err(FormulaError::UnknownFunction("NOSUCH".into()))
        );
        assert_eq!(
            parse("ROUND(1)"),
            Err(FormulaError::ArgumentCount {
                function: "ROUND".into(),
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            parse("SUM(1 2)"),
            Err(FormulaError::MissingComma {
                function: "SUM".into(),
                argument: 1
            })
        );
        assert_eq!(parse("SUM(1,2"), Err(FormulaError::MissingCloseParen));
        assert_eq!(parse("(1+2"), Err(FormulaError::MissingCloseParen));
    }

    #[test]
    fn test_reference_range_errors() {
        assert_eq!(
            parse("IW1"),
            Err(FormulaError::ColumnOutOfRange("IW1".into()))
        );
        assert_eq!(
            parse("A65537"),
            Err(FormulaError::RowOutOfRange("A65537".into()))
        );
        assert!(parse("A65536").is_ok());
    }

    #[test]
    fn test_empty_and_trailing() {
        assert_eq!(parse(""), Err(FormulaError::EmptyFormula));
        assert_eq!(parse("   "), Err(FormulaError::EmptyFormula));
        assert!(matches!(
            parse("1 2"),
            Err(FormulaError::UnexpectedToken { position: 2, .. })
        ));
    }

    #[test]
    fn test_whole_row_3d_range() {
        let Expr::Area3d { first, last, sheets } = parse("Sheet2!3:4").unwrap() else {
            panic!("expected 3-D area");
        };
        assert_eq!(sheets.first, "Sheet2");
        assert_eq!((first.row, first.col), (2, 0));
        assert_eq!((last.row, last.col), (3, 255));
    }
}
