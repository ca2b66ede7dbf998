//! Error taxonomy shared by every runtime phase.
//!
//! Each phase defines its own concrete error type with `thiserror`; all of
//! them tag their failures with an [`ErrorKind`] so hosts can dispatch on
//! the kind without matching on phase-specific types. [`ErrorPayload`] is
//! the serializable shape handed across the embedding boundary.

use serde::Serialize;

/// The kind tag carried by every runtime error.
///
/// Kinds are stable identifiers, not type names; a host switching on them
/// must not depend on which phase produced the error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Illegal character or malformed literal in source text.
    LexError,

    /// Token stream does not match the grammar.
    ParseError,

    /// A `{dotted.path}` reference missing from the reference map.
    UndefinedReference,

    /// Use of a name with no visible binding.
    UndefinedVariable,

    /// Second declaration of a name in the same scope.
    Redeclaration,

    /// Value's type tag does not satisfy the declared or required type.
    TypeMismatch,

    /// Attribute value does not match the schema property's declared type,
    /// or the attribute does not exist on the spec.
    InvalidAttributeType,

    /// Attribute assignment through a chain longer than one step.
    AttributeChainTooLong,

    /// No registered specification matches the requested name or URI.
    MissingSpec,

    /// Specification carries no usable object schema.
    MissingSchema,

    /// Attribute assignment on a color whose payload is a string literal.
    StringValueAssignment,

    /// No conversion path between the requested endpoints.
    NoConversionPath,

    /// No unit could represent every operand of a mixed-unit operation.
    NoCommonUnit,

    /// Initializer invoked with fewer arguments than its schema requires.
    InvalidInitializerArity,

    /// A loop exceeded the configured iteration cap.
    IterationLimitExceeded,

    /// Token-set leaves forming a reference cycle (non-fatal in batch mode).
    TokenCycle,

    /// Token-set reference to a path absent from the current flattened map
    /// (non-fatal in batch mode).
    MissingTokenReference,
}

impl ErrorKind {
    /// The stable string form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LexError => "LexError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::UndefinedReference => "UndefinedReference",
            ErrorKind::UndefinedVariable => "UndefinedVariable",
            ErrorKind::Redeclaration => "Redeclaration",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::InvalidAttributeType => "InvalidAttributeType",
            ErrorKind::AttributeChainTooLong => "AttributeChainTooLong",
            ErrorKind::MissingSpec => "MissingSpec",
            ErrorKind::MissingSchema => "MissingSchema",
            ErrorKind::StringValueAssignment => "StringValueAssignment",
            ErrorKind::NoConversionPath => "NoConversionPath",
            ErrorKind::NoCommonUnit => "NoCommonUnit",
            ErrorKind::InvalidInitializerArity => "InvalidInitializerArity",
            ErrorKind::IterationLimitExceeded => "IterationLimitExceeded",
            ErrorKind::TokenCycle => "TokenCycle",
            ErrorKind::MissingTokenReference => "MissingTokenReference",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The serializable error shape exposed to embedding hosts.
///
/// Optional fields are omitted from the serialized form when absent; which
/// fields are present depends on the error kind (a lex error carries
/// line/column, a token-cycle error carries participants, and so on).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Error-kind tag.
    pub kind: ErrorKind,

    /// Human-readable message.
    pub message: String,

    /// Source line (1-based) when the error has a location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Source column (1-based) when the error has a location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    /// The offending token's rendered form, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Dotted token path, for token-set processing errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Paths participating in a reference cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
}

impl ErrorPayload {
    /// Creates a payload with just a kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            token: None,
            path: None,
            participants: None,
        }
    }

    /// Attaches a source position.
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Attaches the offending token's rendered form.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches a dotted token path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches cycle participants.
    pub fn with_participants(mut self, participants: Vec<String>) -> Self {
        self.participants = Some(participants);
        self
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " at {line}:{column}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " ({path})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorPayload {}
