//! Runtime configuration: language options plus the two spec managers.
//!
//! Exactly one parent config exists per top-level interpret call. Nested
//! interpreters spawned for initializer/conversion scripts receive a
//! clone; cloning shares the managers' registries by reference, so
//! registration effects stay visible without ever re-entering
//! registration from inside a script.

use tokenscript_par::ast::Program;

use crate::color::ColorManager;
use crate::error::{RuntimeError, RuntimeResult};
use crate::unit::UnitManager;

/// Tunable language options.
#[derive(Clone, Copy, Debug)]
pub struct LanguageOptions {
    /// Cap on total loop-body entries per interpret call.
    pub max_iterations: u32,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

/// Shared runtime configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Language options.
    pub options: LanguageOptions,

    colors: ColorManager,
    units: UnitManager,
}

impl Config {
    /// Creates a config with default options and empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with explicit options.
    pub fn with_options(options: LanguageOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The color spec manager.
    pub fn colors(&self) -> &ColorManager {
        &self.colors
    }

    /// The unit spec manager.
    pub fn units(&self) -> &UnitManager {
        &self.units
    }

    /// Registers a color specification from JSON text.
    pub fn register_color_spec(&self, uri: &str, spec_json: &str) -> RuntimeResult<()> {
        self.colors.register(uri, spec_json)
    }

    /// Registers a unit specification from JSON text.
    pub fn register_unit_spec(&self, uri: &str, spec_json: &str) -> RuntimeResult<()> {
        self.units.register(uri, spec_json)
    }

    /// Lexes and parses a script, checking numeric unit suffixes against
    /// the registered unit keywords.
    pub fn parse(&self, source: &str) -> RuntimeResult<Program> {
        tokenscript_par::parse_source_with_units(source, &self.units).map_err(RuntimeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_iteration_cap() {
        assert_eq!(Config::new().options.max_iterations, 1000);
    }

    #[test]
    fn test_clones_share_registries() {
        let config = Config::new();
        let clone = config.clone();

        clone
            .register_unit_spec(
                "https://units/px/1.0.0/",
                r#"{"name": "pixel", "keyword": "px", "type": "absolute"}"#,
            )
            .unwrap();

        // Registration through the clone is visible through the original.
        assert!(config.units().is_unit_keyword("px"));
    }

    #[test]
    fn test_parse_uses_registered_units() {
        let config = Config::new();
        config
            .register_unit_spec(
                "https://units/px/1.0.0/",
                r#"{"name": "pixel", "keyword": "px", "type": "absolute"}"#,
            )
            .unwrap();

        let program = config.parse("return 4px;").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_parse_surfaces_frontend_errors() {
        let config = Config::new();
        let err = config.parse("return @;").unwrap_err();
        assert_eq!(err.kind, tokenscript_util::ErrorKind::LexError);
    }
}
