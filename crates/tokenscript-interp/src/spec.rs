//! Serde models for color and unit specification JSON.
//!
//! Specifications are host-supplied JSON documents; the scripts they embed
//! are TokenScript source compiled to ASTs at registration time. Only the
//! fields the runtime consumes are modeled; unknown fields are ignored.

use indexmap::IndexMap;
use serde::Deserialize;
use tokenscript_util::ErrorKind;

use crate::error::{RuntimeError, RuntimeResult};

/// An embedded script: a MIME-ish type tag plus TokenScript source.
#[derive(Clone, Debug, Deserialize)]
pub struct ScriptSource {
    /// Script content type; informational.
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,

    /// TokenScript source text.
    pub script: String,
}

/// A conversion edge: scripts mapping `source` to `target`.
///
/// In color specs `"$self"` in either endpoint stands for the registering
/// URI; in unit specs the script reads its operand from `{input}`.
#[derive(Clone, Debug, Deserialize)]
pub struct ConversionSpec {
    /// Source URI (or `"$self"`).
    pub source: String,

    /// Target URI (or `"$self"`).
    pub target: String,

    /// Whether the conversion loses no information.
    #[serde(default)]
    pub lossless: bool,

    /// The conversion script.
    pub script: ScriptSource,
}

/// A color initializer: a callable keyword plus its constructor script.
#[derive(Clone, Debug, Deserialize)]
pub struct InitializerSpec {
    /// Function-like name, e.g. `rgb`.
    pub keyword: String,

    /// Constructor script; reads its arguments from `{input}`.
    pub script: ScriptSource,
}

/// A schema property: the declared type of one color attribute.
#[derive(Clone, Debug, Deserialize)]
pub struct SchemaProperty {
    /// `"number"` or `"string"`.
    #[serde(rename = "type")]
    pub property_type: String,
}

/// The object schema of a color spec.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchemaObject {
    /// Schema type; `"object"` when present.
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,

    /// Attribute name to declared type.
    #[serde(default)]
    pub properties: IndexMap<String, SchemaProperty>,

    /// Attributes an initializer must populate.
    #[serde(default)]
    pub required: Vec<String>,
}

/// A color specification document.
#[derive(Clone, Debug, Deserialize)]
pub struct ColorSpec {
    /// Canonical color name, e.g. `"RGB"`.
    pub name: String,

    /// Must be `"color"`.
    #[serde(rename = "type")]
    pub spec_type: String,

    /// Attribute schema.
    #[serde(default)]
    pub schema: Option<SchemaObject>,

    /// Constructor keywords.
    #[serde(default)]
    pub initializers: Vec<InitializerSpec>,

    /// Conversion edges.
    #[serde(default)]
    pub conversions: Vec<ConversionSpec>,
}

impl ColorSpec {
    /// Validates the shape rules a registration must satisfy.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.name.trim().is_empty() {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                "color spec has an empty name",
            ));
        }
        if !self.spec_type.eq_ignore_ascii_case("color") {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                format!(
                    "spec '{}' has type '{}', expected 'color'",
                    self.name, self.spec_type
                ),
            ));
        }

        let Some(schema) = &self.schema else {
            return Err(RuntimeError::new(
                ErrorKind::MissingSchema,
                format!("color spec '{}' has no schema", self.name),
            ));
        };
        for (attr, property) in &schema.properties {
            match property.property_type.as_str() {
                "number" | "string" => {}
                other => {
                    return Err(RuntimeError::new(
                        ErrorKind::MissingSchema,
                        format!(
                            "color spec '{}' property '{attr}' has unsupported type '{other}'",
                            self.name
                        ),
                    ))
                }
            }
        }
        Ok(())
    }

    /// The schema, after [`validate`](Self::validate) has passed.
    pub fn schema(&self) -> &SchemaObject {
        static EMPTY: std::sync::OnceLock<SchemaObject> = std::sync::OnceLock::new();
        self.schema
            .as_ref()
            .unwrap_or_else(|| EMPTY.get_or_init(SchemaObject::default))
    }
}

/// Whether a unit is fixed or defined against another value.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Fixed magnitude, e.g. `px`.
    Absolute,
    /// Magnitude defined against a companion value, e.g. `%`.
    Relative,
}

/// A unit specification document.
#[derive(Clone, Debug, Deserialize)]
pub struct UnitSpec {
    /// Canonical unit name, e.g. `"pixel"`.
    pub name: String,

    /// The literal suffix, e.g. `"px"`.
    pub keyword: String,

    /// Absolute or relative.
    #[serde(rename = "type")]
    pub unit_type: UnitType,

    /// Conversion edges; scripts read their operand from `{input}`.
    #[serde(default)]
    pub conversions: Vec<ConversionSpec>,

    /// For relative units: the resolution script, reading
    /// `{relative_value}` and `{other_value}`.
    #[serde(default)]
    pub to_absolute: Option<ScriptSource>,
}

impl UnitSpec {
    /// Validates the shape rules a registration must satisfy.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.name.trim().is_empty() {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                "unit spec has an empty name",
            ));
        }
        if self.keyword.trim().is_empty() {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                format!("unit spec '{}' has an empty keyword", self.name),
            ));
        }
        if self.unit_type == UnitType::Relative && self.to_absolute.is_none() {
            return Err(RuntimeError::new(
                ErrorKind::MissingSpec,
                format!(
                    "relative unit spec '{}' is missing its to_absolute script",
                    self.name
                ),
            ));
        }
        Ok(())
    }
}
