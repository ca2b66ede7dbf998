//! tokenscript-tokens - The design-token-set processor.
//!
//! Transforms a DTCG-shaped JSON document into resolved leaf values by
//! composing references, merging theme sets, and driving the TokenScript
//! interpreter over every expression leaf in dependency order.
//!
//! ```
//! use tokenscript_interp::Config;
//! use tokenscript_tokens::TokenSetProcessor;
//!
//! let processor = TokenSetProcessor::new(Config::new());
//! let output = processor
//!     .process_str(r#"{
//!         "spacing": {
//!             "base":   {"$value": "8",                 "$type": "number"},
//!             "double": {"$value": "{spacing.base} * 2", "$type": "number"}
//!         }
//!     }"#)
//!     .unwrap();
//!
//! let flat = output.tokens.as_flat().unwrap();
//! assert_eq!(flat["spacing.base"], "8");
//! assert_eq!(flat["spacing.double"], "16");
//! ```
//!
//! Per-leaf failures (cycles, missing references, evaluation errors) are
//! isolated: the leaf is omitted and recorded in the output's
//! diagnostics, and the rest of the batch still resolves.

pub mod flatten;
pub mod graph;
pub mod process;
pub mod themes;
pub mod transform;

pub use flatten::RawToken;
pub use graph::{extract_references, EvalPlan};
pub use process::{ProcessError, ProcessorOutput, ResolvedTokens, TokenSetProcessor};
pub use themes::{SetMode, ThemeDef};
pub use transform::{apply_transforms, TokenTransform, TransformError, TransformMetadata};
