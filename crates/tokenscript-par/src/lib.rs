//! tokenscript-par - Recursive-descent parser for TokenScript.
//!
//! Consumes the token stream produced by `tokenscript-lex` and builds the
//! AST defined in [`ast`]. Expressions are parsed with a Pratt
//! (precedence-climbing) core; statements with plain recursive descent.
//!
//! The parser fails fast: the first token that does not fit the grammar
//! aborts with a [`ParseError`] pointing at it. It never skips tokens to
//! resynchronize - a script either parses completely or not at all.

pub mod ast;
mod expr;
mod stmt;

#[cfg(test)]
mod edge_cases;

use thiserror::Error;
use tokenscript_lex::{LexError, Lexer, Token, TokenKind, UnitLookup};
use tokenscript_util::{ErrorKind, ErrorPayload, Span};

use ast::{Program, Stmt};

/// A syntax error at a specific token.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{message}, found '{token}' at {span}")]
pub struct ParseError {
    /// What the parser expected or could not accept.
    pub message: String,

    /// Rendered form of the offending token.
    pub token: String,

    /// Location of the offending token.
    pub span: Span,
}

impl ParseError {
    /// Converts into the host-facing payload shape.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(ErrorKind::ParseError, self.message.clone())
            .with_position(self.span.line, self.span.column)
            .with_token(self.token.clone())
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A front-end failure: either lexing or parsing.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FrontendError {
    /// Converts into the host-facing payload shape.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            FrontendError::Lex(e) => e.to_payload(),
            FrontendError::Parse(e) => e.to_payload(),
        }
    }
}

/// Lexes and parses a script in one step, without a unit predicate.
pub fn parse_source(source: &str) -> Result<Program, FrontendError> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse_program()?)
}

/// Lexes and parses a script, checking unit suffixes against `units`.
pub fn parse_source_with_units(
    source: &str,
    units: &dyn UnitLookup,
) -> Result<Program, FrontendError> {
    let tokens = Lexer::with_units(source, units).tokenize()?;
    Ok(Parser::new(tokens).parse_program()?)
}

/// The TokenScript parser.
///
/// # Example
///
/// ```
/// use tokenscript_lex::Lexer;
/// use tokenscript_par::Parser;
///
/// let tokens = Lexer::new("return 1 + 2;").tokenize().unwrap();
/// let program = Parser::new(tokens).parse_program().unwrap();
/// assert_eq!(program.len(), 1);
/// ```
pub struct Parser {
    /// Token stream, terminated by `Eof`.
    tokens: Vec<Token>,

    /// Current position in the token stream.
    position: usize,
}

impl Parser {
    /// Creates a parser over a token stream.
    ///
    /// The stream is expected to end with an `Eof` token, as produced by
    /// `Lexer::tokenize`; one is appended if missing.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| !t.is_eof()).unwrap_or(true) {
            let span = tokens.last().map(|t| t.span).unwrap_or(Span::DUMMY);
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses a complete program.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    // =========================================================================
    // TOKEN STREAM HELPERS
    // =========================================================================

    /// The current token.
    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    /// The current token's kind.
    pub(crate) fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// The token `offset` positions ahead (saturating at `Eof`).
    pub(crate) fn peek(&self, offset: usize) -> &Token {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// True once the stream is exhausted.
    pub(crate) fn at_eof(&self) -> bool {
        self.current().is_eof()
    }

    /// Consumes and returns the current token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// Consumes the current token if it equals `kind`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token, requiring it to equal `kind`.
    pub(crate) fn expect(&mut self, kind: &TokenKind, context: &str) -> ParseResult<Token> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected '{kind}' {context}")))
        }
    }

    /// Consumes an identifier token, returning it as an [`ast::Ident`].
    pub(crate) fn expect_ident(&mut self, context: &str) -> ParseResult<ast::Ident> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.advance();
                Ok(ast::Ident {
                    name,
                    span: token.span,
                })
            }
            _ => Err(self.error(format!("expected identifier {context}"))),
        }
    }

    /// Builds an error at the current token.
    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError {
            message: message.into(),
            token: token.kind.to_string(),
            span: token.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::*;

    fn parse(source: &str) -> Program {
        parse_source(source).unwrap()
    }

    #[test]
    fn test_empty_program() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "variable x: Number = 1 + 2 * 3; return x;";
        assert_eq!(parse(source), parse(source));
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        let err = parse_source("return 1").unwrap_err();
        match err {
            FrontendError::Parse(e) => assert!(e.message.contains("';'"), "{}", e.message),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_carries_token_position() {
        let err = parse_source("variable : Number;").unwrap_err();
        let FrontendError::Parse(e) = err else {
            panic!("expected parse error");
        };
        assert_eq!(e.span.line, 1);
        assert_eq!(e.token, ":");
    }

    #[test]
    fn test_program_statement_order() {
        let program = parse("variable a: Number = 1; variable b: Number = 2;");
        let names: Vec<_> = program
            .iter()
            .map(|s| match s {
                Stmt::VarDecl(d) => d.name.name.clone(),
                _ => panic!("expected declarations"),
            })
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
