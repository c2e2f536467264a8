//! Formula tokenizer
//!
//! Splits formula text into tokens. Reference-like words are classified by
//! shape only; range checks and sheet lookups happen later.

use smallvec::SmallVec;

use crate::ole::xls::FormulaError;

use super::super::cell_ref::CellRef;

/// Longest string literal accepted in a formula
pub const MAX_STRING_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal, kept as written
    Number(String),
    /// String literal without the quotes
    Str(String),
    /// `A1`, `$B$2`
    Ref(String),
    /// `A1:B2` or `A1..B2`
    Range(String, String),
    /// `Sheet1!A1`, `'My Sheet'!A1`, `Sheet1:Sheet3!A1`
    Ref3d { sheets: String, cell: String },
    /// `Sheet1!A1:B2`, `Sheet1!3:4`
    Range3d {
        sheets: String,
        first: String,
        last: String,
    },
    /// Function name; always followed by `(`
    Func(String),
    Plus,
    Minus,
    Star,
    Slash,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Semicolon,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Number(s) | Token::Ref(s) | Token::Func(s) => s.clone(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Range(a, b) => format!("{}:{}", a, b),
            Token::Ref3d { sheets, cell } => format!("{}!{}", sheets, cell),
            Token::Range3d {
                sheets,
                first,
                last,
            } => format!("{}!{}:{}", sheets, first, last),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Concat => "&".into(),
            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
            Token::Semicolon => ";".into(),
        }
    }
}

/// A token and the character position where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub type TokenList = SmallVec<[Spanned; 16]>;

/// Character scanner with two characters of lookahead
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn unexpected(&self, token: impl Into<String>, position: usize) -> FormulaError {
        FormulaError::UnexpectedToken {
            token: token.into(),
            position,
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<TokenList, FormulaError> {
        let mut tokens = TokenList::new();
        while let Some(spanned) = self.next_token()? {
            tokens.push(spanned);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Option<Spanned>, FormulaError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '"' => self.string_literal()?,
            '\'' => self.quoted_reference()?,
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '&' => self.single(Token::Concat),
            '=' => self.single(Token::Eq),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            '<' => match self.peek_second() {
                Some('=') => self.double(Token::Le),
                Some('>') => self.double(Token::Ne),
                _ => self.single(Token::Lt),
            },
            '>' => match self.peek_second() {
                Some('=') => self.double(Token::Ge),
                _ => self.single(Token::Gt),
            },
            c if is_word_char(c) => self.word()?,
            other => return Err(self.unexpected(other, start)),
        };

        Ok(Some(Spanned {
            token,
            position: start,
        }))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.pos += 2;
        token
    }

    fn string_literal(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.pos += 1;
                    break;
                },
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                },
                None => return Err(self.unexpected(format!("\"{}", value), start)),
            }
        }
        let len = value.chars().count();
        if len > MAX_STRING_LEN {
            return Err(FormulaError::StringTooLong(len));
        }
        Ok(Token::Str(value))
    }

    /// `'Sheet name'!A1` or `'Sheet1:Sheet2'!A1:B2`
    fn quoted_reference(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        self.pos += 1;
        let mut sheets = String::new();
        loop {
            match self.peek() {
                Some('\'') => {
                    self.pos += 1;
                    break;
                },
                Some(c) if c.is_alphanumeric() || matches!(c, '_' | ' ' | '-' | ':') => {
                    sheets.push(c);
                    self.pos += 1;
                },
                _ => return Err(self.unexpected(format!("'{}", sheets), start)),
            }
        }
        if sheets.is_empty() || self.peek() != Some('!') {
            return Err(self.unexpected(format!("'{}'", sheets), start));
        }
        self.pos += 1;

        let cell_start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        let cells: String = self.chars[cell_start..self.pos].iter().collect();
        classify_3d(&sheets, &cells)
            .ok_or_else(|| self.unexpected(format!("'{}'!{}", sheets, cells), start))
    }

    fn word(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if self.peek() == Some('(') && is_function_name(&word) {
            return Ok(Token::Func(word));
        }
        if is_number(&word) {
            return Ok(Token::Number(word));
        }
        if CellRef::parse(&word).is_some() {
            return Ok(Token::Ref(word));
        }
        if let Some((sheets, cells)) = word.rsplit_once('!') {
            if is_sheet_span(sheets) {
                if let Some(token) = classify_3d(sheets, cells) {
                    return Ok(token);
                }
            }
        } else if let Some((first, last)) = split_range(&word) {
            if CellRef::parse(first).is_some() && CellRef::parse(last).is_some() {
                return Ok(Token::Range(first.to_string(), last.to_string()));
            }
        }

        Err(self.unexpected(word, start))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | ':' | '!')
}

fn is_function_name(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

fn is_number(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
        && word.parse::<f64>().is_ok()
}

/// `Sheet1` or `Sheet1:Sheet2` with word characters only
fn is_sheet_span(sheets: &str) -> bool {
    let is_name = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    match sheets.split_once(':') {
        Some((a, b)) => is_name(a) && is_name(b),
        None => is_name(sheets),
    }
}

fn split_range(text: &str) -> Option<(&str, &str)> {
    text.split_once("..").or_else(|| text.split_once(':'))
}

fn is_row_number(text: &str) -> bool {
    let digits = text.strip_prefix('$').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Classify the part after `!` as a cell, a cell range or a row range
fn classify_3d(sheets: &str, cells: &str) -> Option<Token> {
    if CellRef::parse(cells).is_some() {
        return Some(Token::Ref3d {
            sheets: sheets.to_string(),
            cell: cells.to_string(),
        });
    }
    let (first, last) = split_range(cells)?;
    let cell_range = CellRef::parse(first).is_some() && CellRef::parse(last).is_some();
    if cell_range || (is_row_number(first) && is_row_number(last)) {
        return Some(Token::Range3d {
            sheets: sheets.to_string(),
            first: first.to_string(),
            last: last.to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(formula: &str) -> Vec<Token> {
        Lexer::new(formula)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(
            tokens("A1+B1*2"),
            vec![
                Token::Ref("A1".into()),
                Token::Plus,
                Token::Ref("B1".into()),
                Token::Star,
                Token::Number("2".into()),
            ]
        );
    }

    #[test]
    fn test_comparison_lookahead() {
        assert_eq!(
            tokens("1<2<=3<>4>5>=6"),
            vec![
                Token::Number("1".into()),
                Token::Lt,
                Token::Number("2".into()),
                Token::Le,
                Token::Number("3".into()),
                Token::Ne,
                Token::Number("4".into()),
                Token::Gt,
                Token::Number("5".into()),
                Token::Ge,
                Token::Number("6".into()),
            ]
        );
    }

    #[test]
    fn test_function_and_ranges() {
        assert_eq!(
            tokens("SUM(A1:A2; $B$1..C3)"),
            vec![
                Token::Func("SUM".into()),
                Token::LParen,
                Token::Range("A1".into(), "A2".into()),
                Token::Semicolon,
                Token::Range("$B$1".into(), "C3".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_3d_references() {
        assert_eq!(
            tokens("Sheet1!A1"),
            vec![Token::Ref3d {
                sheets: "Sheet1".into(),
                cell: "A1".into()
            }]
        );
        assert_eq!(
            tokens("'My Sheet'!A1:B2"),
            vec![Token::Range3d {
                sheets: "My Sheet".into(),
                first: "A1".into(),
                last: "B2".into()
            }]
        );
        assert_eq!(
            tokens("Sheet1:Sheet2!3:4"),
            vec![Token::Range3d {
                sheets: "Sheet1:Sheet2".into(),
                first: "3".into(),
                last: "4".into()
            }]
        );
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(tokens("\"a b\"&\"c\""), vec![
            Token::Str("a b".into()),
            Token::Concat,
            Token::Str("c".into()),
        ]);

        let long = format!("\"{}\"", "x".repeat(256));
        assert_eq!(
            Lexer::new(&long).tokenize(),
            Err(FormulaError::StringTooLong(256))
        );
    }

    #[test]
    fn test_unexpected_token() {
        let err = Lexer::new("1 # 2").tokenize().unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnexpectedToken {
                token: "#".into(),
                position: 2
            }
        );
        assert!(Lexer::new("FOO").tokenize().is_err());
    }

    #[test]
    fn test_decimal_numbers() {
        assert_eq!(
            tokens("1.5*.25"),
            vec![
                Token::Number("1.5".into()),
                Token::Star,
                Token::Number(".25".into()),
            ]
        );
    }
}
