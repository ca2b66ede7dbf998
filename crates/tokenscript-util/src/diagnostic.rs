//! Diagnostics accumulation for batch processing.
//!
//! The token-set processor isolates per-leaf failures: a failing leaf is
//! dropped from the output and recorded here, and the batch as a whole
//! succeeds. [`Diagnostics`] is the ordered sink those records land in.

use crate::error::ErrorPayload;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// The leaf (or theme) this diagnostic describes was dropped.
    Error,
    /// Something was tolerated but is worth surfacing.
    Warning,
    /// Informational, e.g. a skipped malformed node.
    Note,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A single recorded diagnostic.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,

    /// The structured error payload.
    pub payload: ErrorPayload,
}

impl Diagnostic {
    /// Creates an error-level diagnostic.
    pub fn error(payload: ErrorPayload) -> Self {
        Self {
            level: Level::Error,
            payload,
        }
    }

    /// Creates a warning-level diagnostic.
    pub fn warning(payload: ErrorPayload) -> Self {
        Self {
            level: Level::Warning,
            payload,
        }
    }

    /// Creates a note-level diagnostic.
    pub fn note(payload: ErrorPayload) -> Self {
        Self {
            level: Level::Note,
            payload,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.level, self.payload)
    }
}

/// An ordered collection of diagnostics.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Records an error-level diagnostic.
    pub fn error(&mut self, payload: ErrorPayload) {
        self.push(Diagnostic::error(payload));
    }

    /// Records a warning-level diagnostic.
    pub fn warning(&mut self, payload: ErrorPayload) {
        self.push(Diagnostic::warning(payload));
    }

    /// Records a note-level diagnostic.
    pub fn note(&mut self, payload: ErrorPayload) {
        self.push(Diagnostic::note(payload));
    }

    /// True if any error-level diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.level == Level::Error)
    }

    /// Number of recorded diagnostics of all levels.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the recorded diagnostics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Consumes the sink, yielding the recorded diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_sink() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_notes_are_not_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.note(ErrorPayload::new(ErrorKind::MissingTokenReference, "skipped"));
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_errors_are_detected() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(ErrorPayload::new(ErrorKind::TokenCycle, "cycle"));
        diagnostics.error(ErrorPayload::new(
            ErrorKind::MissingTokenReference,
            "missing {a.b}",
        ));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.note(ErrorPayload::new(ErrorKind::MissingTokenReference, "one"));
        diagnostics.note(ErrorPayload::new(ErrorKind::MissingTokenReference, "two"));

        let messages: Vec<_> = diagnostics.iter().map(|d| d.payload.message.clone()).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }
}
