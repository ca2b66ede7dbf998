//! The TokenScript lexer.
//!
//! Transforms source text into a forward-only stream of [`Token`]s using
//! direct-coded dispatch on the first character of each lexeme. Lexing is
//! longest-match; whitespace separates tokens and is otherwise ignored;
//! line and block comments (nesting allowed) are skipped. The first illegal
//! character aborts the stream with a [`LexError`] carrying its line and
//! column.
//!
//! A numeric literal immediately followed by a unit keyword lexes as a
//! single [`TokenKind::UnitNumber`] token. Which suffixes count as unit
//! keywords is decided by an injected [`UnitLookup`] predicate (the read
//! side of the unit registry); without a predicate any letter/`%` run is
//! attached and rejection of unregistered units is left to evaluation.

use thiserror::Error;
use tokenscript_util::{ErrorKind, ErrorPayload, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Decides whether a lexeme is a registered unit keyword.
///
/// Implemented by the unit registry's read side and injected into the
/// lexer, so the token stream reflects the units registered at lex time.
pub trait UnitLookup {
    /// True if `keyword` names a registered unit (case-insensitive).
    fn is_unit_keyword(&self, keyword: &str) -> bool;
}

impl<F> UnitLookup for F
where
    F: Fn(&str) -> bool,
{
    fn is_unit_keyword(&self, keyword: &str) -> bool {
        self(keyword)
    }
}

/// A lexical error: the first illegal construct in the source.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at {line}:{column}")]
pub struct LexError {
    /// Line of the offending fragment (1-based).
    pub line: u32,

    /// Column of the offending fragment (1-based).
    pub column: u32,

    /// The offending source fragment.
    pub fragment: String,

    /// Human-readable description.
    pub message: String,
}

impl LexError {
    fn new(line: u32, column: u32, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Converts into the host-facing payload shape.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(ErrorKind::LexError, self.message.clone())
            .with_position(self.line, self.column)
            .with_token(self.fragment.clone())
    }
}

/// Result type for lexing operations.
pub type LexResult<T> = Result<T, LexError>;

/// The TokenScript lexer.
///
/// # Example
///
/// ```
/// use tokenscript_lex::{Lexer, TokenKind};
///
/// let tokens = Lexer::new("variable x: Number = 2 + 3;").tokenize().unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Variable);
/// assert_eq!(tokens[5].kind, TokenKind::Int(2));
/// ```
pub struct Lexer<'a> {
    /// Character cursor over the source.
    cursor: Cursor<'a>,

    /// Registered-unit predicate, when the caller has a unit registry.
    units: Option<&'a dyn UnitLookup>,

    /// Start byte position of the token being lexed.
    token_start: usize,

    /// Start line of the token being lexed.
    token_line: u32,

    /// Start column of the token being lexed.
    token_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer without a unit predicate.
    ///
    /// Any letter/`%` run following a number is attached as its unit
    /// keyword; validation happens at evaluation time.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            units: None,
            token_start: 0,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Creates a lexer that checks unit suffixes against `units`.
    pub fn with_units(source: &'a str, units: &'a dyn UnitLookup) -> Self {
        Self {
            units: Some(units),
            ..Self::new(source)
        }
    }

    /// Lexes the whole source, ending with an `Eof` token.
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token, or `Eof` forever once input is exhausted.
    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia()?;

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();
        self.token_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Ok(self.token(TokenKind::Eof));
        }

        match self.cursor.current() {
            '(' => Ok(self.single(TokenKind::LParen)),
            ')' => Ok(self.single(TokenKind::RParen)),
            '[' => Ok(self.single(TokenKind::LBracket)),
            ']' => Ok(self.single(TokenKind::RBracket)),
            ',' => Ok(self.single(TokenKind::Comma)),
            ';' => Ok(self.single(TokenKind::Semicolon)),
            ':' => Ok(self.single(TokenKind::Colon)),
            '.' => Ok(self.single(TokenKind::Dot)),
            '+' => Ok(self.single(TokenKind::Plus)),
            '-' => Ok(self.single(TokenKind::Minus)),
            '*' => Ok(self.single(TokenKind::Star)),
            '/' => Ok(self.single(TokenKind::Slash)),
            '^' => Ok(self.single(TokenKind::Caret)),
            '%' => Ok(self.single(TokenKind::Percent)),
            '=' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Ok(self.token(TokenKind::EqEq))
                } else {
                    Ok(self.token(TokenKind::Eq))
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Ok(self.token(TokenKind::NotEq))
                } else {
                    Ok(self.token(TokenKind::Not))
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Ok(self.token(TokenKind::LtEq))
                } else {
                    Ok(self.token(TokenKind::Lt))
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    Ok(self.token(TokenKind::GtEq))
                } else {
                    Ok(self.token(TokenKind::Gt))
                }
            }
            '&' => {
                self.cursor.advance();
                if self.cursor.eat('&') {
                    Ok(self.token(TokenKind::AndAnd))
                } else {
                    Err(self.error_here("&", "unexpected character '&'"))
                }
            }
            '|' => {
                self.cursor.advance();
                if self.cursor.eat('|') {
                    Ok(self.token(TokenKind::OrOr))
                } else {
                    Err(self.error_here("|", "unexpected character '|'"))
                }
            }
            '"' | '\'' => self.lex_string(),
            '#' => self.lex_hex_color(),
            '{' => self.lex_reference(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => Ok(self.lex_identifier()),
            c => {
                self.cursor.advance();
                Err(self.error_here(c.to_string(), format!("unexpected character '{c}'")))
            }
        }
    }

    /// Skips whitespace, line comments, and (nested) block comments.
    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            self.cursor.advance_while(|c| c.is_whitespace());

            if self.cursor.current() == '/' && self.cursor.peek(1) == '/' {
                self.cursor.advance_while(|c| c != '\n');
                continue;
            }

            if self.cursor.current() == '/' && self.cursor.peek(1) == '*' {
                let line = self.cursor.line();
                let column = self.cursor.column();
                self.cursor.advance();
                self.cursor.advance();

                let mut depth = 1u32;
                while depth > 0 {
                    if self.cursor.is_at_end() {
                        return Err(LexError::new(
                            line,
                            column,
                            "/*",
                            "unterminated block comment",
                        ));
                    }
                    if self.cursor.current() == '/' && self.cursor.peek(1) == '*' {
                        depth += 1;
                        self.cursor.advance();
                        self.cursor.advance();
                    } else if self.cursor.current() == '*' && self.cursor.peek(1) == '/' {
                        depth -= 1;
                        self.cursor.advance();
                        self.cursor.advance();
                    } else {
                        self.cursor.advance();
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Lexes an identifier, keyword, or type name.
    fn lex_identifier(&mut self) -> Token {
        let text = self
            .cursor
            .advance_while(|c| c.is_ascii_alphanumeric() || c == '_');

        match keyword_from_ident(text) {
            Some(kind) => self.token(kind),
            None => self.token(TokenKind::Ident(text.to_string())),
        }
    }

    /// Lexes a numeric literal, attaching a unit suffix when present.
    fn lex_number(&mut self) -> LexResult<Token> {
        let start = self.cursor.position();
        self.cursor.advance_while(|c| c.is_ascii_digit());

        let mut integral = true;
        if self.cursor.current() == '.' && self.cursor.peek(1).is_ascii_digit() {
            integral = false;
            self.cursor.advance();
            self.cursor.advance_while(|c| c.is_ascii_digit());
        }

        let digits = self.cursor.slice_from(start).to_string();

        // A unit keyword directly after the digits glues into one token.
        if let Some(unit) = self.scan_unit_suffix() {
            let value: f64 = digits.parse().map_err(|_| {
                self.error_here(digits.clone(), "invalid numeric literal")
            })?;
            return Ok(self.token(TokenKind::UnitNumber {
                value,
                integral,
                unit,
            }));
        }

        if integral {
            match digits.parse::<i64>() {
                Ok(value) => Ok(self.token(TokenKind::Int(value))),
                // Magnitudes beyond i64 still lex, as floats.
                Err(_) => match digits.parse::<f64>() {
                    Ok(value) => Ok(self.token(TokenKind::Float(value))),
                    Err(_) => Err(self.error_here(digits, "invalid numeric literal")),
                },
            }
        } else {
            match digits.parse::<f64>() {
                Ok(value) => Ok(self.token(TokenKind::Float(value))),
                Err(_) => Err(self.error_here(digits, "invalid numeric literal")),
            }
        }
    }

    /// Scans the unit suffix after a numeric literal, if any.
    ///
    /// The candidate run is the maximal sequence of ASCII letters and `%`.
    /// With a [`UnitLookup`] present the longest accepted prefix wins and
    /// the cursor backs up to just past it; an entirely rejected run is
    /// still attached whole so evaluation can report the unregistered unit.
    fn scan_unit_suffix(&mut self) -> Option<String> {
        if !is_unit_char(self.cursor.current()) {
            return None;
        }

        let snapshot = self.cursor.snapshot();
        let start = self.cursor.position();
        let run = self
            .cursor
            .advance_while(is_unit_char)
            .to_string();

        let Some(units) = self.units else {
            return Some(run);
        };

        // Longest registered prefix.
        for len in (1..=run.len()).rev() {
            let candidate = &run[..len];
            if units.is_unit_keyword(candidate) {
                self.cursor.restore(snapshot);
                for _ in 0..len {
                    self.cursor.advance();
                }
                return Some(self.cursor.slice_from(start).to_string());
            }
        }

        Some(run)
    }

    /// Lexes a string literal in either quote style.
    fn lex_string(&mut self) -> LexResult<Token> {
        let quote = self.cursor.current();
        self.cursor.advance();

        let mut value = String::new();
        loop {
            if self.cursor.is_at_end() || self.cursor.current() == '\n' {
                return Err(LexError::new(
                    self.token_line,
                    self.token_column,
                    quote.to_string(),
                    "unterminated string literal",
                ));
            }

            let c = self.cursor.current();
            if c == quote {
                self.cursor.advance();
                return Ok(self.token(TokenKind::Str(value)));
            }

            if c == '\\' {
                self.cursor.advance();
                let escaped = self.cursor.current();
                self.cursor.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    other => {
                        return Err(self.error_here(
                            format!("\\{other}"),
                            format!("unknown escape sequence '\\{other}'"),
                        ))
                    }
                }
                continue;
            }

            value.push(c);
            self.cursor.advance();
        }
    }

    /// Lexes a hex color literal: `#rgb`, `#rrggbb`, or `#rrggbbaa`.
    fn lex_hex_color(&mut self) -> LexResult<Token> {
        let start = self.cursor.position();
        self.cursor.advance(); // '#'
        self.cursor.advance_while(|c| c.is_ascii_hexdigit());

        let lexeme = self.cursor.slice_from(start).to_string();
        match lexeme.len() - 1 {
            3 | 6 | 8 => Ok(self.token(TokenKind::HexColor(lexeme))),
            _ => Err(self.error_here(
                lexeme.clone(),
                format!("invalid hex color literal '{lexeme}'"),
            )),
        }
    }

    /// Lexes a reference literal `{dotted.path}`.
    fn lex_reference(&mut self) -> LexResult<Token> {
        self.cursor.advance(); // '{'
        let path = self
            .cursor
            .advance_while(|c| c != '}' && c != '{' && c != '\n')
            .to_string();

        if !self.cursor.eat('}') {
            return Err(LexError::new(
                self.token_line,
                self.token_column,
                "{",
                "unterminated reference",
            ));
        }
        if path.is_empty() {
            return Err(self.error_here("{}", "empty reference"));
        }

        Ok(self.token(TokenKind::Reference(path)))
    }

    /// Builds a token spanning from the recorded token start.
    fn token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.token_start,
                self.cursor.position(),
                self.token_line,
                self.token_column,
            ),
        )
    }

    /// Advances one character and builds a single-character token.
    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.token(kind)
    }

    /// Builds an error anchored at the current token's start.
    fn error_here(&self, fragment: impl Into<String>, message: impl Into<String>) -> LexError {
        LexError::new(self.token_line, self.token_column, fragment, message)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_unit_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '%'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn kinds_with_units(source: &str, units: &[&str]) -> Vec<TokenKind> {
        let owned: Vec<String> = units.iter().map(|u| u.to_lowercase()).collect();
        let lookup = move |kw: &str| owned.contains(&kw.to_lowercase());
        Lexer::with_units(source, &lookup)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("variable x: Number;"),
            vec![
                TokenKind::Variable,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::NumberType,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5"),
            vec![TokenKind::Int(42), TokenKind::Float(3.5), TokenKind::Eof]
        );
    }

    #[test]
    fn test_number_with_unit_suffix() {
        assert_eq!(
            kinds("16px 1.5rem 10%"),
            vec![
                TokenKind::UnitNumber {
                    value: 16.0,
                    integral: true,
                    unit: "px".into()
                },
                TokenKind::UnitNumber {
                    value: 1.5,
                    integral: false,
                    unit: "rem".into()
                },
                TokenKind::UnitNumber {
                    value: 10.0,
                    integral: true,
                    unit: "%".into()
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unit_predicate_longest_match() {
        // "em" is registered; the trailing letters are not part of it.
        let toks = kinds_with_units("2empx", &["em"]);
        assert_eq!(
            toks[0],
            TokenKind::UnitNumber {
                value: 2.0,
                integral: true,
                unit: "em".into()
            }
        );
        // Rest lexes as an identifier.
        assert_eq!(toks[1], TokenKind::Ident("px".into()));
    }

    #[test]
    fn test_unit_predicate_prefers_longest() {
        let toks = kinds_with_units("2rem", &["r", "rem"]);
        assert_eq!(
            toks[0],
            TokenKind::UnitNumber {
                value: 2.0,
                integral: true,
                unit: "rem".into()
            }
        );
    }

    #[test]
    fn test_unregistered_suffix_kept_for_later_rejection() {
        let toks = kinds_with_units("3furlongs", &["px"]);
        assert_eq!(
            toks[0],
            TokenKind::UnitNumber {
                value: 3.0,
                integral: true,
                unit: "furlongs".into()
            }
        );
    }

    #[test]
    fn test_bare_percent_is_operator() {
        assert_eq!(
            kinds("10 % 3"),
            vec![
                TokenKind::Int(10),
                TokenKind::Percent,
                TokenKind::Int(3),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_dot_after_int_is_attribute_access() {
        assert_eq!(
            kinds("3.toString()"),
            vec![
                TokenKind::Int(3),
                TokenKind::Dot,
                TokenKind::Ident("toString".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""a\tb" 'c\'d'"#),
            vec![
                TokenKind::Str("a\tb".into()),
                TokenKind::Str("c'd".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(
            kinds("#fff #a1b2c3 #a1b2c3d4"),
            vec![
                TokenKind::HexColor("#fff".into()),
                TokenKind::HexColor("#a1b2c3".into()),
                TokenKind::HexColor("#a1b2c3d4".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_hex_color() {
        let err = Lexer::new("#ab").tokenize().unwrap_err();
        assert_eq!(err.fragment, "#ab");
    }

    #[test]
    fn test_reference() {
        assert_eq!(
            kinds("{spacing.base} * 2"),
            vec![
                TokenKind::Reference("spacing.base".into()),
                TokenKind::Star,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_reference() {
        let err = Lexer::new("{a.b").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated reference");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= && || ! = ^"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Not,
                TokenKind::Eq,
                TokenKind::Caret,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lone_ampersand_is_an_error() {
        let err = Lexer::new("a & b").tokenize().unwrap_err();
        assert_eq!(err.fragment, "&");
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(
            kinds("1 // ignored\n2"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(
            kinds("1 /* a /* nested */ b */ 2"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = Lexer::new("/* open").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert!(!lexer.next_token().unwrap().is_eof());
        assert!(lexer.next_token().unwrap().is_eof());
        assert!(lexer.next_token().unwrap().is_eof());
    }

    #[test]
    fn test_illegal_character_reports_position() {
        let err = Lexer::new("1 + @").tokenize().unwrap_err();
        assert_eq!(err.fragment, "@");
        assert_eq!((err.line, err.column), (1, 5));
    }
}
