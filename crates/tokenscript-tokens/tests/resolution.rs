//! End-to-end token-set resolution scenarios.

use tokenscript_interp::Config;
use tokenscript_tokens::{ResolvedTokens, TokenSetProcessor};
use tokenscript_util::ErrorKind;

const PX_SPEC: &str = r#"{
    "name": "pixel",
    "keyword": "px",
    "type": "absolute"
}"#;

const RGB_SPEC: &str = r##"{
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
    ]
}"##;

fn processor() -> TokenSetProcessor {
    let config = Config::new();
    config
        .register_unit_spec("https://units/px/1.0.0/", PX_SPEC)
        .unwrap();
    config
        .register_color_spec("https://colors/rgb/1.0.0/", RGB_SPEC)
        .unwrap();
    TokenSetProcessor::new(config)
}

#[test]
fn resolves_reference_expressions() {
    let output = processor()
        .process_str(
            r#"{
                "spacing": {
                    "base":   {"$value": "8", "$type": "number"},
                    "double": {"$value": "{spacing.base} * 2", "$type": "number"}
                }
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat["spacing.base"], "8");
    assert_eq!(flat["spacing.double"], "16");
    assert!(!output.diagnostics.has_errors());
}

#[test]
fn literal_leaves_pass_through_unchanged() {
    let output = processor()
        .process_str(
            r##"{
                "font": {"family": {"$value": "Inter, sans-serif", "$type": "fontFamily"}},
                "color": {"red": {"$value": "#ff0000", "$type": "color"}},
                "size": {"m": {"$value": "16px", "$type": "dimension"}}
            }"##,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat["font.family"], "Inter, sans-serif");
    assert_eq!(flat["color.red"], "#ff0000");
    assert_eq!(flat["size.m"], "16px");
}

#[test]
fn transitive_references_resolve_in_order() {
    let output = processor()
        .process_str(
            r#"{
                "s": {
                    "quad":   {"$value": "{s.double} * 2", "$type": "number"},
                    "double": {"$value": "{s.base} * 2", "$type": "number"},
                    "base":   {"$value": "4", "$type": "number"}
                }
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat["s.quad"], "16");
}

#[test]
fn dimension_arithmetic_through_references() {
    let output = processor()
        .process_str(
            r#"{
                "size": {
                    "base": {"$value": "4px", "$type": "dimension"},
                    "big":  {"$value": "{size.base} * 3", "$type": "dimension"}
                }
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat["size.big"], "12px");
}

#[test]
fn color_call_leaves_evaluate() {
    let output = processor()
        .process_str(
            r#"{
                "brand": {"primary": {"$value": "rgb(255, 0, 0)", "$type": "color"}}
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat["brand.primary"], "rgb(255, 0, 0)");
}

#[test]
fn cycle_is_isolated_and_batch_succeeds() {
    let output = processor()
        .process_str(
            r#"{
                "a": {"$value": "{b} + 1", "$type": "number"},
                "b": {"$value": "{a} + 1", "$type": "number"},
                "ok": {"$value": "5", "$type": "number"}
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat["ok"], "5");

    let cycle = output
        .diagnostics
        .iter()
        .find(|d| d.payload.kind == ErrorKind::TokenCycle)
        .expect("cycle diagnostic");
    let participants = cycle.payload.participants.as_ref().unwrap();
    assert_eq!(participants, &vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn missing_reference_filters_leaf_with_diagnostic() {
    let output = processor()
        .process_str(
            r#"{
                "broken": {"$value": "{ghost.path} * 2", "$type": "number"},
                "fine": {"$value": "1", "$type": "number"}
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert!(!flat.contains_key("broken"));
    assert_eq!(flat["fine"], "1");
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.payload.kind == ErrorKind::MissingTokenReference));
}

#[test]
fn dependent_of_failed_leaf_also_filters() {
    let output = processor()
        .process_str(
            r#"{
                "broken": {"$value": "{ghost} * 2", "$type": "number"},
                "downstream": {"$value": "{broken} + 1", "$type": "number"}
            }"#,
        )
        .unwrap();

    let flat = output.tokens.as_flat().unwrap();
    assert!(flat.is_empty());
    assert_eq!(
        output
            .diagnostics
            .iter()
            .filter(|d| d.payload.kind == ErrorKind::MissingTokenReference)
            .count(),
        2
    );
}

#[test]
fn theme_mode_output_shape() {
    let output = processor()
        .process_str(
            r#"{
                "core": {
                    "base": {"$value": "4", "$type": "number"}
                },
                "light": {
                    "accent": {"$value": "{base} * 2", "$type": "number"}
                },
                "dark": {
                    "accent": {"$value": "{base} * 10", "$type": "number"}
                },
                "$themes": [
                    {"name": "light", "group": "mode",
                     "selectedTokenSets": {"core": "source", "light": "enabled", "dark": "disabled"}},
                    {"name": "dark", "group": "mode",
                     "selectedTokenSets": {"core": "source", "dark": "enabled", "light": "disabled"}}
                ]
            }"#,
        )
        .unwrap();

    let themed = output.tokens.as_themed().unwrap();
    assert_eq!(themed["light"]["accent"], "8");
    assert_eq!(themed["light"]["base"], "4");
    assert_eq!(themed["dark"]["accent"], "40");
}

#[test]
fn theme_enabled_overlays_source() {
    let output = processor()
        .process_str(
            r#"{
                "core": {"tone": {"$value": "gray", "$type": "string"}},
                "brand": {"tone": {"$value": "orange", "$type": "string"}},
                "$themes": [
                    {"name": "brand",
                     "selectedTokenSets": {"core": "source", "brand": "enabled"}}
                ]
            }"#,
        )
        .unwrap();

    let themed = output.tokens.as_themed().unwrap();
    assert_eq!(themed["brand"]["tone"], "orange");
}

#[test]
fn resolution_is_idempotent() {
    let processor = processor();
    let first = processor
        .process_str(
            r#"{
                "spacing": {
                    "base":   {"$value": "8", "$type": "number"},
                    "double": {"$value": "{spacing.base} * 2", "$type": "number"}
                },
                "color": {"red": {"$value": "rgb(255, 0, 0)", "$type": "color"}}
            }"#,
        )
        .unwrap();
    let first_flat = first.tokens.as_flat().unwrap();

    // Re-run the processor over its own output.
    let document = serde_json::json!({
        "spacing": {
            "base":   {"$value": first_flat["spacing.base"], "$type": "number"},
            "double": {"$value": first_flat["spacing.double"], "$type": "number"}
        },
        "color": {"red": {"$value": first_flat["color.red"], "$type": "color"}}
    });
    let second = processor.process(&document);
    let second_flat = second.tokens.as_flat().unwrap();

    assert_eq!(first_flat, second_flat);
}

#[test]
fn invalid_json_is_a_process_error() {
    assert!(processor().process_str("not json").is_err());
}
