//! Token model for TokenScript source.
//!
//! Each token pairs a [`TokenKind`] with the [`Span`] it was lexed from.
//! Literal kinds carry their typed payloads so downstream phases never
//! re-parse lexemes.

use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tokenscript_util::Span;

/// A lexical unit with its source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// What was lexed.
    pub kind: TokenKind,

    /// Where it was lexed from.
    pub span: Span,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True for the end-of-input marker.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// The kind of a lexical unit, with typed payloads for literals.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // =========================================================================
    // KEYWORDS
    // =========================================================================
    /// "variable" - Declaration keyword
    Variable,

    /// "if"
    If,

    /// "elif"
    Elif,

    /// "else"
    Else,

    /// "while"
    While,

    /// "for"
    For,

    /// "in" - For-loop binder separator
    In,

    /// "return"
    Return,

    /// "true"
    True,

    /// "false"
    False,

    /// "null"
    Null,

    // =========================================================================
    // TYPE NAMES
    // =========================================================================
    /// "Number"
    NumberType,

    /// "NumberWithUnit"
    NumberWithUnitType,

    /// "String"
    StringType,

    /// "Boolean"
    BooleanType,

    /// "Color"
    ColorType,

    /// "List"
    ListType,

    /// "Dictionary"
    DictionaryType,

    // =========================================================================
    // IDENTIFIERS AND LITERALS
    // =========================================================================
    /// Identifier (variable, attribute, or initializer-keyword name).
    Ident(String),

    /// Integer literal.
    Int(i64),

    /// Floating point literal.
    Float(f64),

    /// Numeric literal with an attached unit keyword, e.g. `16px`, `10%`.
    ///
    /// `integral` records whether the written form had no decimal point,
    /// so `16px` and `16.0px` stay distinguishable downstream.
    UnitNumber {
        value: f64,
        integral: bool,
        unit: String,
    },

    /// String literal with escapes already processed.
    Str(String),

    /// Hex color literal including the leading `#` (`#rgb`, `#rrggbb`,
    /// `#rrggbbaa`).
    HexColor(String),

    /// Reference literal `{dotted.path}`; the payload is the path without
    /// braces.
    Reference(String),

    // =========================================================================
    // OPERATORS
    // =========================================================================
    /// "+"
    Plus,

    /// "-"
    Minus,

    /// "*"
    Star,

    /// "/"
    Slash,

    /// "^" - Power
    Caret,

    /// "%" - Modulus (a `%` attached to a numeric literal lexes as a unit
    /// suffix instead)
    Percent,

    /// "=="
    EqEq,

    /// "!="
    NotEq,

    /// "<"
    Lt,

    /// "<="
    LtEq,

    /// ">"
    Gt,

    /// ">="
    GtEq,

    /// "&&"
    AndAnd,

    /// "||"
    OrOr,

    /// "!"
    Not,

    /// "=" - Assignment
    Eq,

    // =========================================================================
    // DELIMITERS
    // =========================================================================
    /// "("
    LParen,

    /// ")"
    RParen,

    /// "[" - Block open or index open
    LBracket,

    /// "]"
    RBracket,

    /// ","
    Comma,

    /// ";"
    Semicolon,

    /// ":"
    Colon,

    /// "."
    Dot,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// True for kinds that may begin an expression.
    ///
    /// Used by the parser to decide whether juxtaposed values continue an
    /// implicit list. Prefix `-` is deliberately excluded: after a complete
    /// expression a `-` always binds as the binary operator.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::UnitNumber { .. }
                | TokenKind::Str(_)
                | TokenKind::HexColor(_)
                | TokenKind::Reference(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Not
                | TokenKind::LParen
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Variable => write!(f, "variable"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::For => write!(f, "for"),
            TokenKind::In => write!(f, "in"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Null => write!(f, "null"),
            TokenKind::NumberType => write!(f, "Number"),
            TokenKind::NumberWithUnitType => write!(f, "NumberWithUnit"),
            TokenKind::StringType => write!(f, "String"),
            TokenKind::BooleanType => write!(f, "Boolean"),
            TokenKind::ColorType => write!(f, "Color"),
            TokenKind::ListType => write!(f, "List"),
            TokenKind::DictionaryType => write!(f, "Dictionary"),
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Int(value) => write!(f, "{value}"),
            TokenKind::Float(value) => write!(f, "{value}"),
            TokenKind::UnitNumber { value, integral, unit } => {
                if *integral {
                    write!(f, "{}{unit}", *value as i64)
                } else {
                    write!(f, "{value}{unit}")
                }
            }
            TokenKind::Str(value) => write!(f, "\"{value}\""),
            TokenKind::HexColor(value) => write!(f, "{value}"),
            TokenKind::Reference(path) => write!(f, "{{{path}}}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Not => write!(f, "!"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, "<eof>"),
        }
    }
}

/// Looks up the keyword or type-name token for an identifier lexeme.
///
/// Returns `None` for ordinary identifiers.
pub fn keyword_from_ident(text: &str) -> Option<TokenKind> {
    static KEYWORDS: OnceLock<FxHashMap<&'static str, TokenKind>> = OnceLock::new();
    let map = KEYWORDS.get_or_init(|| {
        let mut m = FxHashMap::default();
        m.insert("variable", TokenKind::Variable);
        m.insert("if", TokenKind::If);
        m.insert("elif", TokenKind::Elif);
        m.insert("else", TokenKind::Else);
        m.insert("while", TokenKind::While);
        m.insert("for", TokenKind::For);
        m.insert("in", TokenKind::In);
        m.insert("return", TokenKind::Return);
        m.insert("true", TokenKind::True);
        m.insert("false", TokenKind::False);
        m.insert("null", TokenKind::Null);
        m.insert("Number", TokenKind::NumberType);
        m.insert("NumberWithUnit", TokenKind::NumberWithUnitType);
        m.insert("String", TokenKind::StringType);
        m.insert("Boolean", TokenKind::BooleanType);
        m.insert("Color", TokenKind::ColorType);
        m.insert("List", TokenKind::ListType);
        m.insert("Dictionary", TokenKind::DictionaryType);
        m
    });
    map.get(text).cloned()
}
