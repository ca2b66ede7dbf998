//! The token-set processor pipeline.
//!
//! Flatten -> (theme composition) -> expression wrapping -> dependency-
//! ordered evaluation. Per-leaf failures are isolated: a failing leaf is
//! omitted from the output and recorded as a diagnostic, and the batch as
//! a whole succeeds.

use indexmap::IndexMap;
use serde_json::Value as Json;
use thiserror::Error;
use tokenscript_interp::{
    interpret_source, ColorValue, Config, Number, UnitValue, Value,
};
use tokenscript_util::{Diagnostics, ErrorKind, ErrorPayload};
use tracing::{debug, warn};

use crate::flatten::{flatten, RawToken};
use crate::graph;
use crate::themes;

/// A failure that prevents processing the document at all.
///
/// Per-leaf failures never surface here; they land in
/// [`ProcessorOutput::diagnostics`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid token-set JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolved output: flat or per-theme.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedTokens {
    /// Dotted path -> resolved string.
    Flat(IndexMap<String, String>),

    /// Theme name -> dotted path -> resolved string.
    Themed(IndexMap<String, IndexMap<String, String>>),
}

impl ResolvedTokens {
    /// The flat map, when not in theme mode.
    pub fn as_flat(&self) -> Option<&IndexMap<String, String>> {
        match self {
            ResolvedTokens::Flat(map) => Some(map),
            ResolvedTokens::Themed(_) => None,
        }
    }

    /// The themed map, when in theme mode.
    pub fn as_themed(&self) -> Option<&IndexMap<String, IndexMap<String, String>>> {
        match self {
            ResolvedTokens::Flat(_) => None,
            ResolvedTokens::Themed(map) => Some(map),
        }
    }
}

/// The result of one processing run.
#[derive(Debug)]
pub struct ProcessorOutput {
    /// Resolved leaves.
    pub tokens: ResolvedTokens,

    /// Declared token types (`$type`), keyed like the flat maps.
    pub token_types: IndexMap<String, Option<String>>,

    /// Per-leaf diagnostics accumulated across the batch.
    pub diagnostics: Diagnostics,
}

/// Transforms a DTCG-shaped document into resolved leaf values by driving
/// the interpreter over every expression leaf in dependency order.
pub struct TokenSetProcessor {
    config: Config,
}

impl TokenSetProcessor {
    /// Creates a processor over a configured runtime.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Processes a document from JSON text.
    pub fn process_str(&self, json: &str) -> Result<ProcessorOutput, ProcessError> {
        let document: Json = serde_json::from_str(json)?;
        Ok(self.process(&document))
    }

    /// Processes a parsed document.
    pub fn process(&self, document: &Json) -> ProcessorOutput {
        let mut diagnostics = Diagnostics::new();

        if let Some(theme_defs) = themes::parse_themes(document, &mut diagnostics) {
            // Theme mode: every top-level group is a token set, flattened
            // relative to its own root.
            let mut set_maps = IndexMap::new();
            if let Json::Object(map) = document {
                for (name, value) in map {
                    if name.starts_with('$') || !value.is_object() {
                        continue;
                    }
                    set_maps.insert(name.clone(), flatten(value, &mut diagnostics));
                }
            }

            let mut themed = IndexMap::new();
            let mut token_types = IndexMap::new();
            for theme in &theme_defs {
                if themed.contains_key(&theme.name) {
                    diagnostics.warning(ErrorPayload::new(
                        ErrorKind::MissingSpec,
                        format!("duplicate theme name '{}'; later definition wins", theme.name),
                    ));
                }
                let composed = themes::compose(theme, &set_maps, &mut diagnostics);
                for (path, token) in &composed {
                    token_types
                        .entry(path.clone())
                        .or_insert_with(|| token.token_type.clone());
                }
                let resolved =
                    self.resolve_map(composed, Some(&theme.name), &mut diagnostics);
                themed.insert(theme.name.clone(), resolved);
            }
            debug!(themes = themed.len(), "token-set processing finished (themed)");
            return ProcessorOutput {
                tokens: ResolvedTokens::Themed(themed),
                token_types,
                diagnostics,
            };
        }

        // Flat mode.
        let flattened = flatten(document, &mut diagnostics);
        let token_types = flattened
            .iter()
            .map(|(path, token)| (path.clone(), token.token_type.clone()))
            .collect();
        let resolved = self.resolve_map(flattened, None, &mut diagnostics);
        debug!(leaves = resolved.len(), "token-set processing finished (flat)");
        ProcessorOutput {
            tokens: ResolvedTokens::Flat(resolved),
            token_types,
            diagnostics,
        }
    }

    /// Resolves one flattened map in dependency order.
    fn resolve_map(
        &self,
        map: IndexMap<String, RawToken>,
        theme: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> IndexMap<String, String> {
        let plan = graph::plan(&map);

        for cycle in &plan.cycles {
            diagnostics.error(
                ErrorPayload::new(
                    ErrorKind::TokenCycle,
                    format!("reference cycle among {} token(s)", cycle.len()),
                )
                .with_participants(cycle.clone()),
            );
        }

        let mut resolved: IndexMap<String, String> = IndexMap::new();
        'leaves: for path in &plan.order {
            let token = &map[path.as_str()];

            if !self.looks_like_expression(&token.value) {
                resolved.insert(path.clone(), token.value.clone());
                continue;
            }

            // Dependencies arrive as typed values through the reference
            // map, so `{spacing.base} * 2` sees the number 8, not "8".
            let mut references = IndexMap::new();
            for reference in graph::extract_references(&token.value) {
                match resolved.get(reference.as_str()) {
                    Some(value) => {
                        references.insert(reference, parse_resolved_literal(value));
                    }
                    None => {
                        let mut payload = ErrorPayload::new(
                            ErrorKind::MissingTokenReference,
                            format!("reference '{{{reference}}}' cannot be resolved"),
                        )
                        .with_path(path.clone());
                        if let Some(theme) = theme {
                            payload.message =
                                format!("{} (theme '{theme}')", payload.message);
                        }
                        warn!(path = %path, reference = %reference, "dropping leaf with unresolved reference");
                        diagnostics.error(payload);
                        continue 'leaves;
                    }
                }
            }

            let source = format!("return {};", token.value);
            match interpret_source(&source, &self.config, references) {
                Ok(Some(value)) => {
                    resolved.insert(path.clone(), value.to_display_string());
                }
                Ok(None) => {
                    resolved.insert(path.clone(), String::new());
                }
                Err(error) => {
                    warn!(path = %path, error = %error, "dropping failing leaf");
                    diagnostics.error(error.to_payload().with_path(path.clone()));
                }
            }
        }
        resolved
    }

    /// Expression heuristic: references, spaced binary operators,
    /// parentheses, or a registered initializer-keyword call.
    fn looks_like_expression(&self, value: &str) -> bool {
        if !graph::extract_references(value).is_empty() {
            return true;
        }
        if value.contains('(') {
            return true;
        }
        const SPACED_OPS: [&str; 6] = [" + ", " - ", " * ", " / ", " ^ ", " % "];
        SPACED_OPS.iter().any(|op| value.contains(op))
    }
}

/// Re-parses a resolved leaf string into a typed value for substitution
/// into dependents.
fn parse_resolved_literal(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(Number::Int(int));
    }
    if let Ok(float) = text.parse::<f64>() {
        return Value::Number(Number::Float(float));
    }
    if let Some(unit_value) = parse_dimension(text) {
        return Value::UnitNumber(unit_value);
    }
    if text.starts_with('#')
        && matches!(text.len(), 4 | 7 | 9)
        && text[1..].chars().all(|c| c.is_ascii_hexdigit())
    {
        return Value::Color(ColorValue::literal("Hex", text));
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(text.to_string()),
    }
}

/// Parses `16px` / `1.5rem` / `10%` shapes.
fn parse_dimension(text: &str) -> Option<UnitValue> {
    let split = text
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .filter(|index| *index > 0)?;
    let (digits, unit) = text.split_at(split);
    if !unit.chars().all(|c| c.is_ascii_alphabetic() || c == '%') {
        return None;
    }

    if let Ok(int) = digits.parse::<i64>() {
        return Some(UnitValue::new(Number::Int(int), unit));
    }
    digits
        .parse::<f64>()
        .ok()
        .map(|float| UnitValue::new(Number::Float(float), unit))
}
