//! tokenscript-lex - Lexical analysis for TokenScript.
//!
//! Transforms TokenScript source text into a stream of tokens. The lexer
//! is a restartable forward-only cursor: construct one per script, pull
//! tokens with [`Lexer::next_token`] or collect them with
//! [`Lexer::tokenize`], and construct a fresh lexer to start over.
//!
//! Token categories:
//!
//! - keywords (`variable`, `if`, `elif`, `else`, `while`, `for`, `in`,
//!   `return`, `true`, `false`, `null`) and type names (`Number`,
//!   `NumberWithUnit`, `String`, `Boolean`, `Color`, `List`, `Dictionary`)
//! - identifiers
//! - numeric literals, including `16px`-style literals where a unit
//!   keyword glued to the digits produces one token; which suffixes count
//!   as units is decided by the injected [`UnitLookup`] predicate
//! - string literals in both quote styles with `\n \t \\ \" \'` escapes
//! - hex color literals (`#rgb`, `#rrggbb`, `#rrggbbaa`)
//! - references `{dotted.path}`
//! - operators and delimiters
//! - `//` line and nestable `/* ... */` block comments (skipped)
//!
//! Lexing is longest-match and fails fast: the first illegal character
//! aborts with a [`LexError`] carrying its line and column.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use lexer::{LexError, LexResult, Lexer, UnitLookup};
pub use token::{keyword_from_ident, Token, TokenKind};

#[cfg(test)]
mod edge_cases;
