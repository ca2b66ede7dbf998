//! The unit specification manager.
//!
//! Holds registered unit specs behind a write-once registry shared (by
//! reference) with every nested interpreter. Performs unit-to-unit
//! conversion by chaining compiled conversion scripts along a BFS path,
//! resolves relative units through their `to_absolute` scripts, and picks
//! the common format mixed-unit arithmetic reduces to.

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
use crate::spec::{UnitSpec, UnitType};
use crate::uri;
use crate::value::{Number, UnitValue, Value};

/// A conversion script compiled at registration time.
#[derive(Clone, Debug)]
pub struct CompiledConversion {
    /// The parsed script.
    pub ast: Arc<Program>,

    /// Whether the spec marked the conversion lossless.
    pub lossless: bool,
}

#[derive(Debug, Default)]
struct UnitRegistry {
    /// Normalized URI -> spec.
    specs: IndexMap<String, Arc<UnitSpec>>,

    /// Upper-cased keyword -> URI.
    keywords: FxHashMap<String, String>,

    /// Lower-cased name -> URI.
    names: FxHashMap<String, String>,

    /// source URI -> target URI -> compiled script.
    conversions: IndexMap<String, IndexMap<String, CompiledConversion>>,

    /// URI -> compiled `to_absolute` script, for relative units.
    to_absolute: FxHashMap<String, Arc<Program>>,
}

impl UnitRegistry {
    fn resolve_uri(&self, requested: &str) -> Option<String> {
        uri::resolve(requested, || Box::new(self.specs.keys()))
    }

    /// Canonical adjacency of `node`: raw edge endpoints resolved against
    /// the currently registered specs.
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

    /// BFS over conversions from `source` to `target`; scripts in path
    /// order.
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
                    // Walk predecessors back to the source.
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

/// Registry of unit specifications.
///
/// Cloning shares the registry, so manager clones handed to nested
/// interpreters see the same specs without re-registration.
#[derive(Clone, Debug, Default)]
pub struct UnitManager {
    registry: Arc<RwLock<UnitRegistry>>,
}

/// The manager is the lexer's unit predicate: a literal's suffix counts
/// as a unit keyword exactly when a spec registered it.
impl tokenscript_lex::UnitLookup for UnitManager {
    fn is_unit_keyword(&self, keyword: &str) -> bool {
        UnitManager::is_unit_keyword(self, keyword)
    }
}

impl UnitManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit spec from its JSON text.
    pub fn register(&self, uri: &str, spec_json: &str) -> RuntimeResult<()> {
        let spec: UnitSpec = serde_json::from_str(spec_json).map_err(|e| {
            RuntimeError::new(ErrorKind::MissingSpec, format!("invalid unit spec JSON: {e}"))
        })?;
        self.register_spec(uri, spec)
    }

    /// Registers an already-deserialized unit spec.
    ///
    /// Validates the shape, compiles every conversion script (and the
    /// `to_absolute` script of a relative unit) to an AST, and indexes the
    /// spec by URI, keyword, and name. Specs are immutable once
    /// registered.
    pub fn register_spec(&self, raw_uri: &str, spec: UnitSpec) -> RuntimeResult<()> {
        spec.validate()?;
        let uri = uri::normalize(raw_uri);

        // Scripts may mention units registered later, so they are lexed
        // without a unit predicate; evaluation validates unit keywords.
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

        let to_absolute = match &spec.to_absolute {
            Some(script) => Some(Arc::new(
                parse_source(&script.script).map_err(RuntimeError::from)?,
            )),
            None => None,
        };

        let mut registry = self.registry.write();
        registry
            .keywords
            .insert(spec.keyword.to_uppercase(), uri.clone());
        registry.names.insert(spec.name.to_lowercase(), uri.clone());
        for (source, target, conversion) in conversions {
            registry
                .conversions
                .entry(source)
                .or_default()
                .insert(target, conversion);
        }
        if let Some(ast) = to_absolute {
            registry.to_absolute.insert(uri.clone(), ast);
        }
        debug!(uri = %uri, keyword = %spec.keyword, kind = ?spec.unit_type, "registered unit spec");
        registry.specs.insert(uri, Arc::new(spec));
        Ok(())
    }

    /// True if `keyword` names a registered unit (case-insensitive).
    pub fn is_unit_keyword(&self, keyword: &str) -> bool {
        self.registry
            .read()
            .keywords
            .contains_key(&keyword.to_uppercase())
    }

    /// The registered URI behind a unit keyword.
    pub fn keyword_uri(&self, keyword: &str) -> Option<String> {
        self.registry
            .read()
            .keywords
            .get(&keyword.to_uppercase())
            .cloned()
    }

    /// The spec registered under a (version-resolved) URI.
    pub fn spec_by_uri(&self, requested: &str) -> Option<Arc<UnitSpec>> {
        let registry = self.registry.read();
        let key = registry.resolve_uri(requested)?;
        registry.specs.get(&key).cloned()
    }

    /// The spec behind a unit keyword.
    pub fn spec_for_keyword(&self, keyword: &str) -> Option<Arc<UnitSpec>> {
        let uri = self.keyword_uri(keyword)?;
        self.spec_by_uri(&uri)
    }

    /// The spec registered under a canonical unit name
    /// (case-insensitive).
    pub fn spec_by_name(&self, name: &str) -> Option<Arc<UnitSpec>> {
        let registry = self.registry.read();
        let uri = registry.names.get(&name.to_lowercase())?.clone();
        registry.specs.get(&uri).cloned()
    }

    /// True if `keyword` names a registered relative unit.
    pub fn is_relative(&self, keyword: &str) -> bool {
        self.spec_for_keyword(keyword)
            .map(|spec| spec.unit_type == UnitType::Relative)
            .unwrap_or(false)
    }

    /// Converts a dimensioned value to the unit registered at `target`.
    ///
    /// Identity conversions return the value unchanged; otherwise the BFS
    /// path's scripts run in order, each reading the running magnitude
    /// from `{input}`.
    pub fn convert_to(
        &self,
        value: &UnitValue,
        target_uri: &str,
        config: &Config,
    ) -> RuntimeResult<UnitValue> {
        let (chain, target_keyword) = {
            let registry = self.registry.read();

            let Some(source) = registry
                .keywords
                .get(&value.unit.to_uppercase())
                .and_then(|u| registry.resolve_uri(u))
            else {
                return Err(RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("unit '{}' is not registered", value.unit),
                ));
            };
            let Some(target) = registry.resolve_uri(target_uri) else {
                return Err(RuntimeError::new(
                    ErrorKind::NoConversionPath,
                    format!("no unit registered at '{target_uri}'"),
                ));
            };

            let target_keyword = registry
                .specs
                .get(&target)
                .map(|spec| spec.keyword.clone())
                .unwrap_or_else(|| value.unit.clone());

            if source == target {
                return Ok(UnitValue::new(value.value, target_keyword));
            }

            let Some(chain) = registry.find_path(&source, &target) else {
                return Err(RuntimeError::new(
                    ErrorKind::NoConversionPath,
                    format!(
                        "no conversion path from '{}' to '{target_keyword}'",
                        value.unit
                    ),
                ));
            };
            (chain, target_keyword)
        };

        let mut magnitude = value.value;
        for conversion in chain {
            magnitude = self.run_magnitude_script(conversion.ast, magnitude, config)?;
        }
        Ok(UnitValue::new(magnitude, target_keyword))
    }

    /// Converts a dimensioned value to another registered unit keyword.
    pub fn convert_to_keyword(
        &self,
        value: &UnitValue,
        target_keyword: &str,
        config: &Config,
    ) -> RuntimeResult<UnitValue> {
        if value.unit.eq_ignore_ascii_case(target_keyword) {
            return Ok(value.clone());
        }
        let Some(target_uri) = self.keyword_uri(target_keyword) else {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("unit '{target_keyword}' is not registered"),
            ));
        };
        self.convert_to(value, &target_uri, config)
    }

    /// Reduces a mixed sequence of numbers and dimensioned numbers to a
    /// common format.
    ///
    /// 1. A single relative operand resolves through its `to_absolute`
    ///    script against the sum of the other magnitudes and is replaced
    ///    in place.
    /// 2. Otherwise every distinct unit is tried as the target; a
    ///    candidate survives only if every dimensioned operand converts.
    /// 3. The surviving candidate maximizing the largest absolute value
    ///    in its converted sequence wins (ties break by insertion order).
    pub fn convert_to_common_format(
        &self,
        inputs: &[Value],
        config: &Config,
    ) -> RuntimeResult<Vec<Value>> {
        let dimensioned: Vec<&UnitValue> = inputs
            .iter()
            .filter_map(|v| match v {
                Value::UnitNumber(u) => Some(u),
                _ => None,
            })
            .collect();
        if dimensioned.is_empty() {
            return Ok(inputs.to_vec());
        }

        // Step 1: exactly one relative operand resolves against the rest.
        let relatives: Vec<usize> = inputs
            .iter()
            .enumerate()
            .filter(|(_, v)| v.unit().map(|u| self.is_relative(u)).unwrap_or(false))
            .map(|(i, _)| i)
            .collect();
        if relatives.len() == 1 && inputs.len() > 1 {
            let index = relatives[0];
            let resolved = self.resolve_relative(inputs, index, config)?;
            let mut outputs = inputs.to_vec();
            outputs[index] = resolved;
            return Ok(outputs);
        }

        // Step 2: candidate target units, in insertion order.
        let mut candidates: Vec<String> = Vec::new();
        for unit in dimensioned.iter().map(|u| &u.unit) {
            if !candidates.iter().any(|c| c.eq_ignore_ascii_case(unit)) {
                candidates.push(unit.clone());
            }
        }

        let mut best: Option<(f64, Vec<Value>)> = None;
        for candidate in &candidates {
            let Some(converted) = self.try_convert_all(inputs, candidate, config) else {
                continue;
            };
            let largest = converted
                .iter()
                .filter_map(|v| v.magnitude())
                .map(|n| n.as_f64().abs())
                .fold(f64::NEG_INFINITY, f64::max);

            // Strictly-greater keeps the earliest candidate on ties.
            match &best {
                Some((incumbent, _)) if largest <= *incumbent => {}
                _ => best = Some((largest, converted)),
            }
        }

        match best {
            Some((_, converted)) => Ok(converted),
            None => Err(RuntimeError::new(
                ErrorKind::NoCommonUnit,
                format!(
                    "no common unit for operands [{}]",
                    inputs
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }

    /// Attempts to convert every dimensioned input to `candidate`.
    fn try_convert_all(
        &self,
        inputs: &[Value],
        candidate: &str,
        config: &Config,
    ) -> Option<Vec<Value>> {
        let mut converted = Vec::with_capacity(inputs.len());
        for input in inputs {
            match input {
                Value::UnitNumber(u) => {
                    let value = self.convert_to_keyword(u, candidate, config).ok()?;
                    converted.push(Value::UnitNumber(value));
                }
                other => converted.push(other.clone()),
            }
        }
        Some(converted)
    }

    /// Resolves the relative operand at `index` against its companions.
    ///
    /// `relative_value` is the relative magnitude; `other_value` is the
    /// sum of the other operands' magnitudes. The result adopts the first
    /// companion's unit unless the script returned a dimensioned value.
    fn resolve_relative(
        &self,
        inputs: &[Value],
        index: usize,
        config: &Config,
    ) -> RuntimeResult<Value> {
        let Value::UnitNumber(relative) = &inputs[index] else {
            return Ok(inputs[index].clone());
        };

        let ast = {
            let registry = self.registry.read();
            let uri = registry
                .keywords
                .get(&relative.unit.to_uppercase())
                .and_then(|u| registry.resolve_uri(u))
                .ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::MissingSpec,
                        format!("unit '{}' is not registered", relative.unit),
                    )
                })?;
            registry.to_absolute.get(&uri).cloned().ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::MissingSpec,
                    format!("unit '{}' has no to_absolute script", relative.unit),
                )
            })?
        };

        let mut other_sum = Number::Int(0);
        let mut companion_unit = None;
        for (i, input) in inputs.iter().enumerate() {
            if i == index {
                continue;
            }
            if let Some(magnitude) = input.magnitude() {
                other_sum = other_sum.add(magnitude);
            }
            if companion_unit.is_none() {
                companion_unit = input.unit().map(|u| u.to_string());
            }
        }

        let mut references = IndexMap::new();
        references.insert(
            "relative_value".to_string(),
            Value::Number(relative.value),
        );
        references.insert("other_value".to_string(), Value::Number(other_sum));

        let result = Interpreter::for_script(ast, config, references)
            .interpret()?
            .unwrap_or(Value::Null);

        match result {
            Value::UnitNumber(resolved) => Ok(Value::UnitNumber(resolved)),
            Value::Number(magnitude) => Ok(match companion_unit {
                Some(unit) => Value::UnitNumber(UnitValue::new(magnitude, unit)),
                None => Value::Number(magnitude),
            }),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "to_absolute script for '{}' returned {}, expected a number",
                    relative.unit,
                    other.type_name()
                ),
            )),
        }
    }

    /// Runs one conversion script over a magnitude.
    fn run_magnitude_script(
        &self,
        ast: Arc<Program>,
        input: Number,
        config: &Config,
    ) -> RuntimeResult<Number> {
        let mut references = IndexMap::new();
        references.insert("input".to_string(), Value::Number(input));

        let result = Interpreter::for_script(ast, config, references)
            .interpret()?
            .unwrap_or(Value::Null);

        result.magnitude().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "unit conversion script returned {}, expected a number",
                    result.type_name()
                ),
            )
        })
    }
}
