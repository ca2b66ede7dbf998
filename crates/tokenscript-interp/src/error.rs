//! Runtime error type shared by the interpreter and the spec managers.

use thiserror::Error;
use tokenscript_par::FrontendError;
use tokenscript_util::{ErrorKind, ErrorPayload, Span};

/// An error raised while evaluating a script or operating a spec manager.
///
/// Carries the [`ErrorKind`] tag, a human message, and the span of the
/// originating token when the failure has a source location.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    /// Error-kind tag.
    pub kind: ErrorKind,

    /// Human-readable message.
    pub message: String,

    /// Originating token's location, when known.
    pub span: Option<Span>,
}

impl RuntimeError {
    /// Creates an error without a location.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attaches the originating token's span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attaches the span only if none is present yet.
    ///
    /// Lets outer evaluation frames anchor errors raised by span-less
    /// manager internals without clobbering a more precise location.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Converts into the host-facing payload shape.
    pub fn to_payload(&self) -> ErrorPayload {
        let payload = ErrorPayload::new(self.kind, self.message.clone());
        match self.span {
            Some(span) => payload.with_position(span.line, span.column),
            None => payload,
        }
    }
}

impl From<FrontendError> for RuntimeError {
    fn from(error: FrontendError) -> Self {
        match error {
            FrontendError::Lex(e) => RuntimeError {
                kind: ErrorKind::LexError,
                message: e.message.clone(),
                span: Some(Span::point(0, e.line, e.column)),
            },
            FrontendError::Parse(e) => RuntimeError {
                kind: ErrorKind::ParseError,
                message: format!("{}, found '{}'", e.message, e.token),
                span: Some(e.span),
            },
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_span_keeps_existing_location() {
        let inner = Span::new(0, 1, 3, 5);
        let outer = Span::new(0, 1, 1, 1);
        let err = RuntimeError::new(ErrorKind::TypeMismatch, "boom")
            .with_span(inner)
            .or_span(outer);
        assert_eq!(err.span, Some(inner));
    }

    #[test]
    fn test_payload_includes_position() {
        let err = RuntimeError::new(ErrorKind::UndefinedVariable, "no 'x'")
            .with_span(Span::new(0, 1, 2, 7));
        let payload = err.to_payload();
        assert_eq!(payload.line, Some(2));
        assert_eq!(payload.column, Some(7));
    }
}
