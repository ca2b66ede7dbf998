//! Theme definitions and per-theme set composition.
//!
//! The optional root `$themes` array lists theme definitions; each theme
//! selects token sets as `source`, `enabled`, or `disabled`. A theme's
//! token map is the union of its selected sets: source sets resolve
//! first, enabled sets overlay them, disabled sets are ignored.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;
use tokenscript_util::{Diagnostics, ErrorKind, ErrorPayload};

use crate::flatten::RawToken;

/// How a theme selects one token set.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SetMode {
    /// Resolves first; provides the base values.
    Source,
    /// Overlays source sets.
    Enabled,
    /// Ignored.
    Disabled,
}

/// One theme definition from `$themes`.
#[derive(Clone, Debug, Deserialize)]
pub struct ThemeDef {
    /// Theme name; keys the themed output map.
    pub name: String,

    /// Optional theme group.
    #[serde(default)]
    pub group: Option<String>,

    /// Set name to selection mode.
    #[serde(rename = "selectedTokenSets", default)]
    pub selected_token_sets: IndexMap<String, SetMode>,
}

/// Parses the root `$themes` array, if present.
///
/// Malformed entries are recorded and skipped; a document without
/// `$themes` returns `None` (flat mode).
pub fn parse_themes(root: &Json, diagnostics: &mut Diagnostics) -> Option<Vec<ThemeDef>> {
    let entries = root.get("$themes")?.as_array()?;

    let mut themes = Vec::new();
    for entry in entries {
        match serde_json::from_value::<ThemeDef>(entry.clone()) {
            Ok(theme) => themes.push(theme),
            Err(e) => diagnostics.warning(ErrorPayload::new(
                ErrorKind::MissingSpec,
                format!("skipped malformed theme definition: {e}"),
            )),
        }
    }
    Some(themes)
}

/// Unions the flattened maps of a theme's selected sets.
///
/// Source sets land first (in selection order), enabled sets overlay
/// them; later values win on path collisions.
pub fn compose(
    theme: &ThemeDef,
    set_maps: &IndexMap<String, IndexMap<String, RawToken>>,
    diagnostics: &mut Diagnostics,
) -> IndexMap<String, RawToken> {
    let mut composed = IndexMap::new();

    for mode in [SetMode::Source, SetMode::Enabled] {
        for (set_name, selection) in &theme.selected_token_sets {
            if *selection != mode {
                continue;
            }
            let Some(set_map) = set_maps.get(set_name) else {
                diagnostics.warning(
                    ErrorPayload::new(
                        ErrorKind::MissingTokenReference,
                        format!("theme '{}' selects unknown set '{set_name}'", theme.name),
                    )
                    .with_path(set_name.clone()),
                );
                continue;
            };
            for (path, token) in set_map {
                composed.insert(path.clone(), token.clone());
            }
        }
    }
    composed
}
