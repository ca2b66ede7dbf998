//! The post-resolution transform contract.
//!
//! Hosts may register an ordered list of transforms applied to resolved
//! leaf values. Each transform names the token types it targets and maps
//! a resolved value (plus metadata) to a new value. A failing transform
//! is fatal or recorded per the `continue_on_error` flag.

use indexmap::IndexMap;
use thiserror::Error;
use tokenscript_util::{Diagnostics, ErrorKind, ErrorPayload};
use tracing::warn;

/// Metadata handed to a transform alongside the value.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformMetadata {
    /// Dotted path of the leaf.
    pub path: String,

    /// Declared token type (`$type`), when present.
    pub token_type: Option<String>,

    /// Theme name, in theme mode.
    pub theme: Option<String>,
}

/// A transform failure.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("transform '{transform}' failed on '{path}': {message}")]
pub struct TransformError {
    /// Name of the failing transform.
    pub transform: String,

    /// Path of the leaf being transformed.
    pub path: String,

    /// What went wrong.
    pub message: String,
}

/// A named post-resolution transform.
pub trait TokenTransform {
    /// Transform name, used in diagnostics.
    fn name(&self) -> &str;

    /// Token types this transform targets; empty targets every leaf.
    fn target_types(&self) -> Vec<String>;

    /// Maps a resolved value to its transformed form.
    fn transform(
        &self,
        value: &str,
        metadata: &TransformMetadata,
    ) -> Result<String, TransformError>;

    /// Optionally rewrites the metadata seen by later transforms.
    fn transform_metadata(&self, metadata: TransformMetadata) -> TransformMetadata {
        metadata
    }
}

/// Applies an ordered list of transforms to a resolved map in place.
///
/// With `continue_on_error` set, failures are recorded as diagnostics and
/// the leaf keeps its previous value; otherwise the first failure aborts.
pub fn apply_transforms(
    tokens: &mut IndexMap<String, String>,
    token_types: &IndexMap<String, Option<String>>,
    theme: Option<&str>,
    transforms: &[Box<dyn TokenTransform>],
    continue_on_error: bool,
    diagnostics: &mut Diagnostics,
) -> Result<(), TransformError> {
    for (path, value) in tokens.iter_mut() {
        let mut metadata = TransformMetadata {
            path: path.clone(),
            token_type: token_types.get(path).cloned().flatten(),
            theme: theme.map(|t| t.to_string()),
        };

        for transform in transforms {
            let targets = transform.target_types();
            if !targets.is_empty() {
                let applies = metadata
                    .token_type
                    .as_ref()
                    .map(|t| targets.iter().any(|target| target == t))
                    .unwrap_or(false);
                if !applies {
                    continue;
                }
            }

            match transform.transform(value, &metadata) {
                Ok(next) => {
                    *value = next;
                    metadata = transform.transform_metadata(metadata);
                }
                Err(error) if continue_on_error => {
                    warn!(path = %path, transform = transform.name(), "transform failed; continuing");
                    diagnostics.error(
                        ErrorPayload::new(ErrorKind::TypeMismatch, error.to_string())
                            .with_path(path.clone()),
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PxSuffix;

    impl TokenTransform for PxSuffix {
        fn name(&self) -> &str {
            "px-suffix"
        }

        fn target_types(&self) -> Vec<String> {
            vec!["number".to_string()]
        }

        fn transform(
            &self,
            value: &str,
            _metadata: &TransformMetadata,
        ) -> Result<String, TransformError> {
            Ok(format!("{value}px"))
        }
    }

    struct AlwaysFails;

    impl TokenTransform for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn target_types(&self) -> Vec<String> {
            Vec::new()
        }

        fn transform(
            &self,
            _value: &str,
            metadata: &TransformMetadata,
        ) -> Result<String, TransformError> {
            Err(TransformError {
                transform: "always-fails".to_string(),
                path: metadata.path.clone(),
                message: "nope".to_string(),
            })
        }
    }

    fn sample() -> (IndexMap<String, String>, IndexMap<String, Option<String>>) {
        let mut tokens = IndexMap::new();
        tokens.insert("spacing.base".to_string(), "8".to_string());
        tokens.insert("label".to_string(), "hi".to_string());

        let mut types = IndexMap::new();
        types.insert("spacing.base".to_string(), Some("number".to_string()));
        types.insert("label".to_string(), Some("string".to_string()));
        (tokens, types)
    }

    #[test]
    fn test_transform_targets_by_type() {
        let (mut tokens, types) = sample();
        let transforms: Vec<Box<dyn TokenTransform>> = vec![Box::new(PxSuffix)];
        let mut diagnostics = Diagnostics::new();

        apply_transforms(&mut tokens, &types, None, &transforms, false, &mut diagnostics)
            .unwrap();

        assert_eq!(tokens["spacing.base"], "8px");
        assert_eq!(tokens["label"], "hi");
    }

    #[test]
    fn test_failure_is_fatal_by_default() {
        let (mut tokens, types) = sample();
        let transforms: Vec<Box<dyn TokenTransform>> = vec![Box::new(AlwaysFails)];
        let mut diagnostics = Diagnostics::new();

        let err = apply_transforms(
            &mut tokens,
            &types,
            None,
            &transforms,
            false,
            &mut diagnostics,
        )
        .unwrap_err();
        assert_eq!(err.transform, "always-fails");
    }

    #[test]
    fn test_failure_recorded_when_continuing() {
        let (mut tokens, types) = sample();
        let transforms: Vec<Box<dyn TokenTransform>> = vec![Box::new(AlwaysFails)];
        let mut diagnostics = Diagnostics::new();

        apply_transforms(&mut tokens, &types, None, &transforms, true, &mut diagnostics)
            .unwrap();

        // Values untouched, failures recorded per leaf.
        assert_eq!(tokens["spacing.base"], "8");
        assert_eq!(diagnostics.len(), 2);
    }
}
