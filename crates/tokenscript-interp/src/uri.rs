//! Spec-URI version resolution.
//!
//! Spec URIs end in a version path segment: `.../<name>/<semver>/` where
//! `<semver>` is `MAJOR`, `MAJOR.MINOR`, `MAJOR.MINOR.PATCH`, or the
//! literal `latest`. When a lookup misses, candidates are generated from
//! most specific to least (`1.2.3/ -> 1.2/ -> 1/ -> latest/`) and the
//! first registered match wins; `latest/` resolves to the highest version
//! registered under the same base path.
//!
//! Versions here are deliberately partial (the URI grammar admits bare
//! `MAJOR` and `MAJOR.MINOR`), so this is a small bespoke type rather
//! than a strict-semver dependency.

/// A possibly partial semantic version parsed from a URI segment.
///
/// Comparison zero-fills absent components, so `1.2` and `1.2.0` compare
/// equal.
#[derive(Clone, Copy, Debug)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

impl PartialVersion {
    /// Parses `"1"`, `"1.2"`, or `"1.2.3"`.
    pub fn parse(segment: &str) -> Option<Self> {
        let mut parts = segment.split('.');

        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };
        let patch = match parts.next() {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// Ordering key with absent components treated as zero.
    fn key(&self) -> (u64, u64, u64) {
        (
            self.major,
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
    }

    /// Widening candidates, most specific first, ending with `latest`.
    fn fallback_segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        if let (Some(minor), Some(patch)) = (self.minor, self.patch) {
            segments.push(format!("{}.{}.{}", self.major, minor, patch));
        }
        if let Some(minor) = self.minor {
            segments.push(format!("{}.{}", self.major, minor));
        }
        segments.push(format!("{}", self.major));
        segments.push("latest".to_string());
        segments
    }
}

impl PartialEq for PartialVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PartialVersion {}

impl Ord for PartialVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for PartialVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Normalizes a URI to always end in `/`.
pub fn normalize(uri: &str) -> String {
    let trimmed = uri.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

/// Splits a normalized URI into its base path and version segment.
///
/// `https://specs/rgb/1.2.3/` -> `("https://specs/rgb/", "1.2.3")`.
/// Returns `None` when the last segment is neither a version nor `latest`.
fn split_versioned(uri: &str) -> Option<(&str, &str)> {
    let without_slash = uri.strip_suffix('/')?;
    let cut = without_slash.rfind('/')? + 1;
    let (base, segment) = without_slash.split_at(cut);

    if segment == "latest" || PartialVersion::parse(segment).is_some() {
        Some((base, segment))
    } else {
        None
    }
}

/// Resolves a requested URI against the registered set.
///
/// Exact (normalized) matches win. Otherwise the version segment widens
/// step by step, and `latest` picks the highest version registered under
/// the same base path. Returns the registered key that matched.
pub fn resolve<'a, I>(requested: &str, registered: I) -> Option<String>
where
    I: Fn() -> Box<dyn Iterator<Item = &'a String> + 'a>,
{
    let requested = normalize(requested);

    if registered().any(|key| *key == requested) {
        return Some(requested);
    }

    let (base, segment) = split_versioned(&requested)?;

    let candidates: Vec<String> = if segment == "latest" {
        vec!["latest".to_string()]
    } else {
        PartialVersion::parse(segment)?.fallback_segments()
    };

    for candidate in candidates {
        if candidate == "latest" {
            // Highest registered version under the same base.
            let best = registered()
                .filter_map(|key| {
                    let (key_base, key_segment) = split_versioned(key)?;
                    if key_base != base {
                        return None;
                    }
                    PartialVersion::parse(key_segment).map(|v| (v, key))
                })
                .max_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, key)| key.clone());

            if best.is_some() {
                return best;
            }
            // A literally registered ".../latest/" still matches.
            let literal = format!("{base}latest/");
            if registered().any(|key| *key == literal) {
                return Some(literal);
            }
        } else {
            let uri = format!("{base}{candidate}/");
            if registered().any(|key| *key == uri) {
                return Some(uri);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn run(requested: &str, keys: &[&str]) -> Option<String> {
        let keys = resolver(keys);
        resolve(requested, || Box::new(keys.iter()))
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(
            run("https://s/rgb/1.2.3/", &["https://s/rgb/1.2.3/"]),
            Some("https://s/rgb/1.2.3/".into())
        );
    }

    #[test]
    fn test_missing_trailing_slash_normalizes() {
        assert_eq!(
            run("https://s/rgb/1.2.3", &["https://s/rgb/1.2.3/"]),
            Some("https://s/rgb/1.2.3/".into())
        );
    }

    #[test]
    fn test_widening_patch_to_minor() {
        assert_eq!(
            run("https://s/rgb/1.2.3/", &["https://s/rgb/1.2/"]),
            Some("https://s/rgb/1.2/".into())
        );
    }

    #[test]
    fn test_widening_to_major() {
        assert_eq!(
            run("https://s/rgb/1.2.3/", &["https://s/rgb/1/"]),
            Some("https://s/rgb/1/".into())
        );
    }

    #[test]
    fn test_widening_prefers_most_specific() {
        assert_eq!(
            run(
                "https://s/rgb/1.2.3/",
                &["https://s/rgb/1/", "https://s/rgb/1.2/"]
            ),
            Some("https://s/rgb/1.2/".into())
        );
    }

    #[test]
    fn test_latest_picks_highest_version() {
        assert_eq!(
            run(
                "https://s/rgb/latest/",
                &[
                    "https://s/rgb/1.2.0/",
                    "https://s/rgb/1.10.0/",
                    "https://s/rgb/1.9.9/"
                ]
            ),
            Some("https://s/rgb/1.10.0/".into())
        );
    }

    #[test]
    fn test_latest_ignores_other_bases() {
        assert_eq!(
            run(
                "https://s/rgb/latest/",
                &["https://s/hsl/9.0.0/", "https://s/rgb/1.0.0/"]
            ),
            Some("https://s/rgb/1.0.0/".into())
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(run("https://s/rgb/2.0.0/", &["https://s/hsl/1.0.0/"]), None);
    }

    #[test]
    fn test_unversioned_uri_requires_exact_match() {
        assert_eq!(run("https://s/rgb/stable/", &["https://s/rgb/1.0.0/"]), None);
    }

    #[test]
    fn test_resolution_is_monotone() {
        // Registering a more specific URI never widens an existing hit.
        let before = run("https://s/rgb/1.2.3/", &["https://s/rgb/1.2/"]).unwrap();
        let after = run(
            "https://s/rgb/1.2.3/",
            &["https://s/rgb/1.2/", "https://s/rgb/1.2.3/"],
        )
        .unwrap();
        assert_eq!(before, "https://s/rgb/1.2/");
        assert_eq!(after, "https://s/rgb/1.2.3/");
    }

    #[test]
    fn test_partial_version_ordering() {
        let a = PartialVersion::parse("1.2").unwrap();
        let b = PartialVersion::parse("1.2.1").unwrap();
        assert!(a < b);
        assert!(PartialVersion::parse("2").unwrap() > b);
    }

    #[test]
    fn test_partial_version_rejects_garbage() {
        assert!(PartialVersion::parse("").is_none());
        assert!(PartialVersion::parse("a.b").is_none());
        assert!(PartialVersion::parse("1.2.3.4").is_none());
    }
}
