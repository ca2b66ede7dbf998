//! tokenscript-util - Shared infrastructure for the TokenScript runtime.
//!
//! This crate hosts the pieces every phase of the runtime needs: source
//! spans for error attribution, the error-kind taxonomy shared across the
//! lexer, parser, interpreter, and token-set processor, the serializable
//! error payload handed to embedding hosts, and the diagnostics sink used
//! by batch token-set processing.

pub mod diagnostic;
pub mod error;
pub mod span;

pub use diagnostic::{Diagnostic, Diagnostics, Level};
pub use error::{ErrorKind, ErrorPayload};
pub use span::Span;
