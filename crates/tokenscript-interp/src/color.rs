//! The color specification manager.
//!
//! Holds registered color specs behind a write-once registry shared (by
//! reference) with every nested interpreter. Registration compiles each
//! initializer and conversion script to an AST; construction and
//! conversion run those ASTs in child interpreters that share this
//! registry without re-entering registration.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokenscript_par::ast::Program;
use tokenscript_par::parse_source;
use tokenscript_util::ErrorKind;
use tracing::debug;

use crate::config::Config;
use crate::error::{RuntimeError, RuntimeResult};
use crate::interpreter::Interpreter;
use crate::spec::ColorSpec;
use crate::unit::CompiledConversion;
use crate::uri;
use crate::value::{ColorPayload, ColorValue, ListValue, Value};

#[derive(Debug, Default)]
struct ColorRegistry {
    /// Normalized URI -> spec.
    specs: IndexMap<String, Arc<ColorSpec>>,

    /// Lower-cased canonical name -> URI.
    names: FxHashMap<String, String>,

    /// Lower-cased initializer keyword -> compiled constructor script.
    initializers: FxHashMap<String, (String, Arc<Program>)>,

    /// source URI -> target URI -> compiled conversion script.
    conversions: IndexMap<String, IndexMap<String, CompiledConversion>>,
}

impl ColorRegistry {
    fn resolve_uri(&self, requested: &str) -> Option<String> {
        uri::resolve(requested, || Box::new(self.specs.keys()))
    }

    fn uri_for_sub_type(&self, sub_type: &str) -> Option<String> {
        self.names.get(&sub_type.to_lowercase()).cloned()
    }

    fn resolved_edges(&self, node: &str) -> Vec<(String, CompiledConversion)> {
        let mut edges = Vec::new();
        for (raw_source, targets) in &self.conversions {
            let Some(source) = self.resolve_uri(raw_source) else {
                continue;
            };
            if source != node {
                continue;
            }
            for (raw_target, conversion) in targets {
                if let Some(target) = self.resolve_uri(raw_target) {
                    edges.push((target, conversion.clone()));
                }
            }
        }
        edges
    }

    /// BFS over conversion edges; scripts in path order.
    fn find_path(&self, source: &str, target: &str) -> Option<Vec<CompiledConversion>> {
        let mut visited: FxHashMap<String, (String, CompiledConversion)> = FxHashMap::default();
        let mut queue = VecDeque::new();
        queue.push_back(source.to_string());

        while let Some(node) = queue.pop_front() {
            for (next, conversion) in self.resolved_edges(&node) {
                if next == source || visited.contains_key(&next) {
                    continue;
                }
                visited.insert(next.clone(), (node.clone(), conversion));
                if next == target {
                    let mut chain = Vec::new();
                    let mut cursor = target.to_string();
                    while cursor != source {
                        let (previous, conversion) = visited.get(&cursor)?.clone();
                        chain.push(conversion);
                        cursor = previous;
                    }
                    chain.reverse();
                    return Some(chain);
                }
                queue.push_back(next);
            }
        }
        None
    }
}

/// Registry of color specifications.
///
/// Cloning shares the registry, so manager clones handed to nested
/// interpreters see the same specs without re-registration.
#[derive(Clone, Debug, Default)]
pub struct ColorManager {
    registry: Arc<RwLock<ColorRegistry>>,
}

impl ColorManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a color spec from its JSON text.
    pub fn register(&self, uri: &str, spec_json: &str) -> RuntimeResult<()> {
        let spec: ColorSpec = serde_json::from_str(spec_json).map_err(|e| {
            RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("invalid color spec JSON: {e}"),
            )
        })?;
        self.register_spec(uri, spec)
    }

    /// Registers an already-deserialized color spec.
    pub fn register_spec(&self, raw_uri: &str, spec: ColorSpec) -> RuntimeResult<()> {
        spec.validate()?;
        let uri = uri::normalize(raw_uri);

        let mut initializers = Vec::new();
        for initializer in &spec.initializers {
            let ast = parse_source(&initializer.script.script).map_err(RuntimeError::from)?;
            initializers.push((initializer.keyword.to_lowercase(), Arc::new(ast)));
        }

        let mut conversions = Vec::new();
        for conversion in &spec.conversions {
            let ast = parse_source(&conversion.script.script).map_err(RuntimeError::from)?;
            let source = if conversion.source == "$self" {
                uri.clone()
            } else {
                uri::normalize(&conversion.source)
            };
            let target = if conversion.target == "$self" {
                uri.clone()
            } else {
                uri::normalize(&conversion.target)
            };
            conversions.push((
                source,
                target,
                CompiledConversion {
                    ast: Arc::new(ast),
                    lossless: conversion.lossless,
                },
            ));
        }

        let mut registry = self.registry.write();
        registry.names.insert(spec.name.to_lowercase(), uri.clone());
        for (keyword, ast) in initializers {
            registry.initializers.insert(keyword, (uri.clone(), ast));
        }
        for (source, target, conversion) in conversions {
            registry
                .conversions
                .entry(source)
                .or_default()
                .insert(target, conversion);
        }
        debug!(uri = %uri, name = %spec.name, "registered color spec");
        registry.specs.insert(uri, Arc::new(spec));
        Ok(())
    }

    /// True if `keyword` names a registered initializer (case-insensitive).
    pub fn has_initializer(&self, keyword: &str) -> bool {
        self.registry
            .read()
            .initializers
            .contains_key(&keyword.to_lowercase())
    }

    /// The spec registered under a (version-resolved) URI.
    pub fn spec_by_uri(&self, requested: &str) -> Option<Arc<ColorSpec>> {
        let registry = self.registry.read();
        let key = registry.resolve_uri(requested)?;
        registry.specs.get(&key).cloned()
    }

    /// The spec registered under a canonical color name
    /// (case-insensitive).
    pub fn spec_by_name(&self, name: &str) -> Option<Arc<ColorSpec>> {
        let registry = self.registry.read();
        let uri = registry.uri_for_sub_type(name)?;
        registry.specs.get(&uri).cloned()
    }

    /// Whether a conversion path exists between two (version-resolved)
    /// endpoints.
    pub fn has_conversion(&self, source_uri: &str, target_uri: &str) -> bool {
        let registry = self.registry.read();
        let (Some(source), Some(target)) = (
            registry.resolve_uri(source_uri),
            registry.resolve_uri(target_uri),
        ) else {
            return false;
        };
        source == target || registry.find_path(&source, &target).is_some()
    }

    /// Whether the conversion path between two endpoints loses no
    /// information: every edge on the chosen path is marked lossless.
    ///
    /// Identity paths are lossless; `None` when no path exists.
    pub fn conversion_is_lossless(&self, source_uri: &str, target_uri: &str) -> Option<bool> {
        let registry = self.registry.read();
        let source = registry.resolve_uri(source_uri)?;
        let target = registry.resolve_uri(target_uri)?;
        if source == target {
            return Some(true);
        }
        let chain = registry.find_path(&source, &target)?;
        Some(chain.iter().all(|conversion| conversion.lossless))
    }

    /// Runs a registered initializer over evaluated arguments.
    ///
    /// The constructor script reads its arguments from `{input}` and must
    /// produce a Color of the registering spec's type.
    pub fn run_initializer(
        &self,
        keyword: &str,
        args: Vec<Value>,
        config: &Config,
    ) -> RuntimeResult<Value> {
        let (uri, ast) = {
            let registry = self.registry.read();
            let Some((uri, ast)) = registry.initializers.get(&keyword.to_lowercase()) else {
                return Err(RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("no color initializer '{keyword}' is registered"),
                ));
            };
            (uri.clone(), ast.clone())
        };

        let spec = self.spec_by_uri(&uri).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("initializer '{keyword}' has no backing spec"),
            )
        })?;
        let required = spec.schema().required.len();
        if required > 0 && args.len() < required {
            return Err(RuntimeError::new(
                ErrorKind::InvalidInitializerArity,
                format!(
                    "initializer '{keyword}' expects {required} arguments, got {}",
                    args.len()
                ),
            ));
        }

        let mut references = IndexMap::new();
        references.insert("input".to_string(), Value::List(ListValue::new(args)));

        let result = Interpreter::for_script(ast, config, references)
            .interpret()?
            .unwrap_or(Value::Null);

        match result {
            Value::Color(color) => Ok(Value::Color(color)),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "initializer '{keyword}' returned {}, expected a Color",
                    other.type_name()
                ),
            )),
        }
    }

    /// Converts a color to the spec registered under a canonical name.
    ///
    /// This backs the surface form `color.to.<name>()`.
    pub fn convert_to_by_type(
        &self,
        color: &ColorValue,
        target_name: &str,
        config: &Config,
    ) -> RuntimeResult<ColorValue> {
        let (source_uri, target_uri) = {
            let registry = self.registry.read();
            let source = registry.uri_for_sub_type(&color.sub_type).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("no color spec registered for '{}'", color.sub_type),
                )
            })?;
            let target = registry.uri_for_sub_type(target_name).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("no color spec registered for '{target_name}'"),
                )
            })?;
            (source, target)
        };
        self.convert(color, &source_uri, &target_uri, config)
    }

    /// Converts a color between two spec URIs: identity, direct edge, or
    /// BFS-chained scripts, each reading the running color from `{input}`.
    pub fn convert(
        &self,
        color: &ColorValue,
        source_uri: &str,
        target_uri: &str,
        config: &Config,
    ) -> RuntimeResult<ColorValue> {
        let (chain, target_spec) = {
            let registry = self.registry.read();
            let Some(source) = registry.resolve_uri(source_uri) else {
                return Err(RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("no color spec registered at '{source_uri}'"),
                ));
            };
            let Some(target) = registry.resolve_uri(target_uri) else {
                return Err(RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("no color spec registered at '{target_uri}'"),
                ));
            };

            if source == target {
                return Ok(color.clone());
            }

            let Some(chain) = registry.find_path(&source, &target) else {
                return Err(RuntimeError::new(
                    ErrorKind::NoConversionPath,
                    format!("no conversion path from '{source}' to '{target}'"),
                ));
            };
            let target_spec = registry.specs.get(&target).cloned();
            (chain, target_spec)
        };

        let target_name = target_spec
            .as_ref()
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| color.sub_type.clone());

        let mut current = color.clone();
        for conversion in chain {
            let mut references = IndexMap::new();
            references.insert("input".to_string(), Value::Color(current.clone()));

            let result = Interpreter::for_script(conversion.ast, config, references)
                .interpret()?
                .unwrap_or(Value::Null);

            current = self.coerce_conversion_result(result, &target_name)?;
        }
        Ok(current)
    }

    /// Accepts a conversion script's result: a Color passes through, a
    /// bare scalar wraps back into the target color shape.
    fn coerce_conversion_result(
        &self,
        result: Value,
        target_name: &str,
    ) -> RuntimeResult<ColorValue> {
        match result {
            Value::Color(color) => Ok(color),
            Value::Str(payload) => Ok(ColorValue::literal(target_name, payload)),
            Value::Number(n) => Ok(ColorValue::literal(target_name, n.to_string())),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "conversion script returned {}, expected a Color",
                    other.type_name()
                ),
            )),
        }
    }

    /// Reads an attribute off a color through its spec's schema.
    pub fn get_attribute(&self, color: &ColorValue, attr: &str) -> RuntimeResult<Value> {
        let spec = self.spec_by_name(&color.sub_type).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("no color spec registered for '{}'", color.sub_type),
            )
        })?;

        if !spec.schema().properties.contains_key(attr) {
            return Err(RuntimeError::new(
                ErrorKind::InvalidAttributeType,
                format!("color '{}' has no attribute '{attr}'", spec.name),
            ));
        }

        match &color.payload {
            ColorPayload::Attributes(attrs) => {
                Ok(attrs.borrow().get(attr).cloned().unwrap_or(Value::Null))
            }
            ColorPayload::Literal(_) => Err(RuntimeError::new(
                ErrorKind::InvalidAttributeType,
                format!(
                    "color '{}' holds a string payload; attribute '{attr}' is not addressable",
                    spec.name
                ),
            )),
        }
    }

    /// Writes an attribute on a color in place.
    ///
    /// Only single-step chains are addressable; the schema's declared
    /// property type is enforced against the incoming value's tag.
    pub fn set_attribute(
        &self,
        color: &ColorValue,
        attrs: &[String],
        value: Value,
    ) -> RuntimeResult<()> {
        if attrs.len() != 1 {
            return Err(RuntimeError::new(
                ErrorKind::AttributeChainTooLong,
                format!(
                    "attribute assignment addresses one attribute, got chain of {}",
                    attrs.len()
                ),
            ));
        }
        let attr = &attrs[0];

        let spec = self.spec_by_name(&color.sub_type).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("no color spec registered for '{}'", color.sub_type),
            )
        })?;

        let Some(property) = spec.schema().properties.get(attr) else {
            return Err(RuntimeError::new(
                ErrorKind::InvalidAttributeType,
                format!("color '{}' has no attribute '{attr}'", spec.name),
            ));
        };

        let matches = match property.property_type.as_str() {
            "number" => matches!(value, Value::Number(_)),
            "string" => matches!(value, Value::Str(_)),
            _ => false,
        };
        if !matches {
            return Err(RuntimeError::new(
                ErrorKind::InvalidAttributeType,
                format!(
                    "attribute '{attr}' of color '{}' is declared {}, got {}",
                    spec.name,
                    property.property_type,
                    value.type_name()
                ),
            ));
        }

        match &color.payload {
            ColorPayload::Attributes(map) => {
                map.borrow_mut().insert(attr.clone(), value);
                Ok(())
            }
            ColorPayload::Literal(_) => Err(RuntimeError::new(
                ErrorKind::StringValueAssignment,
                format!(
                    "color '{}' holds a string payload and rejects attribute writes",
                    spec.name
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::value::Number;

    fn rgb_spec() -> &'static str {
        r##"{
            "name": "RGB",
            "type": "color",
            "schema": {
                "type": "object",
                "properties": {
                    "r": {"type": "number"},
                    "g": {"type": "number"},
                    "b": {"type": "number"}
                },
                "required": ["r", "g", "b"]
            },
            "initializers": [
                {"keyword": "rgb",
                 "script": {"type": "text/x-tokenscript",
                            "script": "variable c: Color.Rgb; c.r = {input}.get(0); c.g = {input}.get(1); c.b = {input}.get(2); return c;"}}
            ],
            "conversions": [
                {"source": "$self", "target": "https://colors/hsl/1.0.0/", "lossless": false,
                 "script": {"type": "text/x-tokenscript",
                            "script": "variable c: Color.Hsl; c.h = 0; c.s = 0; c.l = {input}.r / 255; return c;"}}
            ]
        }"##
    }

    fn hsl_spec() -> &'static str {
        r##"{
            "name": "HSL",
            "type": "color",
            "schema": {
                "type": "object",
                "properties": {
                    "h": {"type": "number"},
                    "s": {"type": "number"},
                    "l": {"type": "number"}
                }
            }
        }"##
    }

    fn config_with_colors() -> Config {
        let config = Config::new();
        config
            .colors()
            .register("https://colors/rgb/1.0.0/", rgb_spec())
            .unwrap();
        config
            .colors()
            .register("https://colors/hsl/1.0.0/", hsl_spec())
            .unwrap();
        config
    }

    #[test]
    fn test_initializer_keyword_is_case_insensitive() {
        let config = config_with_colors();
        assert!(config.colors().has_initializer("rgb"));
        assert!(config.colors().has_initializer("RGB"));
        assert!(!config.colors().has_initializer("hsl"));
    }

    #[test]
    fn test_run_initializer_builds_color() {
        let config = config_with_colors();
        let args = vec![
            Value::Number(Number::Int(255)),
            Value::Number(Number::Int(128)),
            Value::Number(Number::Int(0)),
        ];
        let Value::Color(color) = config
            .colors()
            .run_initializer("rgb", args, &config)
            .unwrap()
        else {
            panic!("expected a color");
        };
        assert_eq!(color.sub_type, "Rgb");
        assert_eq!(
            config.colors().get_attribute(&color, "g").unwrap(),
            Value::Number(Number::Int(128))
        );
    }

    #[test]
    fn test_initializer_arity_is_enforced() {
        let config = config_with_colors();
        let err = config
            .colors()
            .run_initializer("rgb", vec![Value::Number(Number::Int(255))], &config)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInitializerArity);
    }

    #[test]
    fn test_convert_direct_edge() {
        let config = config_with_colors();
        let args = vec![
            Value::Number(Number::Int(255)),
            Value::Number(Number::Int(0)),
            Value::Number(Number::Int(0)),
        ];
        let Value::Color(rgb) = config
            .colors()
            .run_initializer("rgb", args, &config)
            .unwrap()
        else {
            panic!("expected a color");
        };

        let hsl = config
            .colors()
            .convert_to_by_type(&rgb, "hsl", &config)
            .unwrap();
        assert_eq!(hsl.sub_type, "Hsl");
        assert_eq!(
            config.colors().get_attribute(&hsl, "l").unwrap(),
            Value::Number(Number::Int(1))
        );
    }

    #[test]
    fn test_identity_conversion_returns_same_color() {
        let config = config_with_colors();
        let color = ColorValue::empty("Rgb");
        let back = config
            .colors()
            .convert(
                &color,
                "https://colors/rgb/1.0.0/",
                "https://colors/rgb/1.0.0/",
                &config,
            )
            .unwrap();
        assert_eq!(back, color);
    }

    #[test]
    fn test_no_conversion_path() {
        let config = config_with_colors();
        let color = ColorValue::empty("Hsl");
        let err = config
            .colors()
            .convert_to_by_type(&color, "rgb", &config)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoConversionPath);
    }

    #[test]
    fn test_losslessness_follows_path_marking() {
        let config = config_with_colors();
        // Identity is lossless; the rgb->hsl edge is marked lossy.
        assert_eq!(
            config.colors().conversion_is_lossless(
                "https://colors/rgb/1.0.0/",
                "https://colors/rgb/1.0.0/"
            ),
            Some(true)
        );
        assert_eq!(
            config.colors().conversion_is_lossless(
                "https://colors/rgb/1.0.0/",
                "https://colors/hsl/1.0.0/"
            ),
            Some(false)
        );
        assert_eq!(
            config.colors().conversion_is_lossless(
                "https://colors/hsl/1.0.0/",
                "https://colors/rgb/1.0.0/"
            ),
            None
        );
    }

    #[test]
    fn test_conversion_existence_uses_version_resolution() {
        let config = config_with_colors();
        assert!(config
            .colors()
            .has_conversion("https://colors/rgb/1.0.3/", "https://colors/hsl/1/"));
        assert!(!config
            .colors()
            .has_conversion("https://colors/hsl/1.0.0/", "https://colors/rgb/1.0.0/"));
    }

    #[test]
    fn test_attribute_chain_too_long() {
        let config = config_with_colors();
        let color = ColorValue::empty("Rgb");
        let err = config
            .colors()
            .set_attribute(
                &color,
                &["r".to_string(), "deep".to_string()],
                Value::Number(Number::Int(1)),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AttributeChainTooLong);
    }

    #[test]
    fn test_string_payload_rejects_attribute_write() {
        let config = config_with_colors();
        let color = ColorValue::literal("Rgb", "#fff");
        let err = config
            .colors()
            .set_attribute(&color, &["r".to_string()], Value::Number(Number::Int(1)))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::StringValueAssignment);
    }

    #[test]
    fn test_schema_type_enforced_on_write() {
        let config = config_with_colors();
        let color = ColorValue::empty("Rgb");
        let err = config
            .colors()
            .set_attribute(&color, &["r".to_string()], Value::Str("red".into()))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAttributeType);
    }

    #[test]
    fn test_unknown_attribute_read() {
        let config = config_with_colors();
        let color = ColorValue::empty("Rgb");
        let err = config.colors().get_attribute(&color, "alpha").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAttributeType);
    }
}
