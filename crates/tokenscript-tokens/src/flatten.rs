//! Flattening of DTCG-shaped token documents.
//!
//! Walks nested groups recursively, producing a map from dotted path to
//! raw value string. A leaf is an object carrying `$value` (optionally
//! `$type`) or the legacy `value`+`type` pair; the `$`-prefixed form wins
//! when both are present. Arrays stringify `", "`-joined; non-string
//! scalars stringify plainly; nested objects that are neither groups nor
//! leaves are skipped with a note.

use indexmap::IndexMap;
use serde_json::Value as Json;
use tokenscript_util::{Diagnostics, ErrorKind, ErrorPayload};

/// A flattened leaf before resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct RawToken {
    /// The raw value string.
    pub value: String,

    /// The declared token type (`$type`/`type`), when present.
    pub token_type: Option<String>,
}

/// Flattens a document (or one token set) into dotted-path order.
pub fn flatten(root: &Json, diagnostics: &mut Diagnostics) -> IndexMap<String, RawToken> {
    let mut out = IndexMap::new();
    if let Json::Object(map) = root {
        for (key, value) in map {
            // `$`-prefixed root keys ($themes, $metadata) are not groups.
            if key.starts_with('$') {
                continue;
            }
            walk(value, key, &mut out, diagnostics);
        }
    }
    out
}

fn walk(node: &Json, path: &str, out: &mut IndexMap<String, RawToken>, diagnostics: &mut Diagnostics) {
    let Json::Object(map) = node else {
        diagnostics.note(
            ErrorPayload::new(
                ErrorKind::MissingTokenReference,
                "skipped non-object node in token tree",
            )
            .with_path(path),
        );
        return;
    };

    if let Some((value, token_type)) = leaf_fields(map) {
        match stringify(value) {
            Some(value) => {
                out.insert(
                    path.to_string(),
                    RawToken {
                        value,
                        token_type: token_type.map(|t| t.to_string()),
                    },
                );
            }
            None => {
                diagnostics.note(
                    ErrorPayload::new(
                        ErrorKind::MissingTokenReference,
                        "skipped leaf with non-stringifiable value",
                    )
                    .with_path(path),
                );
            }
        }
        return;
    }

    for (key, value) in map {
        if key.starts_with('$') {
            continue;
        }
        let child_path = format!("{path}.{key}");
        walk(value, &child_path, out, diagnostics);
    }
}

/// Extracts the value/type pair of a leaf object, standard form first.
fn leaf_fields(map: &serde_json::Map<String, Json>) -> Option<(&Json, Option<&str>)> {
    if let Some(value) = map.get("$value") {
        let token_type = map.get("$type").and_then(Json::as_str);
        return Some((value, token_type));
    }
    if let (Some(value), Some(token_type)) = (map.get("value"), map.get("type")) {
        return Some((value, token_type.as_str()));
    }
    None
}

/// Stringifies a leaf value; `None` for shapes with no string form.
fn stringify(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Null => Some("null".to_string()),
        Json::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(stringify).collect();
            Some(parts.join(", "))
        }
        Json::Object(_) => None,
    }
}
