//! Reference extraction and dependency-ordered evaluation planning.
//!
//! Leaves referencing other leaves form a DAG; evaluation follows a Kahn
//! topological order so every dependency resolves before its dependents.
//! Nodes left unordered after the Kahn pass sit on reference cycles; they
//! are grouped into connected components and surfaced per component, and
//! the rest of the batch still evaluates.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::flatten::RawToken;

/// Extracts `{dotted.path}` references from a raw value string.
pub fn extract_references(text: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let path = &after[..close];
        if !path.is_empty() && !path.contains('{') {
            references.push(path.to_string());
        }
        rest = &after[close + 1..];
    }
    references
}

/// A dependency-ordered evaluation plan.
#[derive(Debug)]
pub struct EvalPlan {
    /// Paths in evaluation order; excludes cycle participants.
    pub order: Vec<String>,

    /// Reference cycles, one participants list per connected component.
    pub cycles: Vec<Vec<String>>,
}

/// Plans evaluation over a flattened map.
///
/// References to paths absent from the map do not block ordering; the
/// leaf itself fails later with a missing-reference diagnostic.
pub fn plan(map: &IndexMap<String, RawToken>) -> EvalPlan {
    // dependency -> dependents, and per-node pending dependency counts.
    let mut dependents: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    let mut pending: IndexMap<&str, usize> = IndexMap::new();

    for (path, token) in map {
        pending.entry(path.as_str()).or_insert(0);
        for reference in extract_references(&token.value) {
            if let Some((dependency, _)) = map.get_key_value(reference.as_str()) {
                if dependency != path {
                    *pending.entry(path.as_str()).or_insert(0) += 1;
                    dependents
                        .entry(dependency.as_str())
                        .or_default()
                        .push(path.as_str());
                }
            }
        }
    }

    let mut queue: VecDeque<&str> = VecDeque::new();
    for (path, count) in &pending {
        if *count == 0 {
            queue.push_back(*path);
        }
    }

    let mut order = Vec::new();
    while let Some(path) = queue.pop_front() {
        order.push(path.to_string());
        let children = dependents.get(path).cloned().unwrap_or_default();
        for child in children {
            if let Some(count) = pending.get_mut(child) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    // Anything still pending participates in a cycle (a self-reference
    // counts). Group leftovers by connectivity over reference edges.
    let mut leftover: Vec<&str> = Vec::new();
    for (path, count) in &pending {
        if *count > 0 || is_self_referential(path, map) {
            leftover.push(*path);
        }
    }
    let order: Vec<String> = order
        .into_iter()
        .filter(|path| !is_self_referential(path, map))
        .collect();

    let cycles = group_components(&leftover, map);
    EvalPlan { order, cycles }
}

fn is_self_referential(path: &str, map: &IndexMap<String, RawToken>) -> bool {
    map.get(path)
        .map(|token| extract_references(&token.value).iter().any(|r| r == path))
        .unwrap_or(false)
}

/// Groups cycle participants into weakly connected components.
fn group_components(leftover: &[&str], map: &IndexMap<String, RawToken>) -> Vec<Vec<String>> {
    let in_cycle: FxHashSet<&str> = leftover.iter().copied().collect();

    // Undirected adjacency restricted to cycle participants.
    let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for path in leftover.iter().copied() {
        for reference in extract_references(&map[path].value) {
            if let Some(other) = in_cycle.get(reference.as_str()).copied() {
                adjacency.entry(path).or_default().push(other);
                adjacency.entry(other).or_default().push(path);
            }
        }
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut components = Vec::new();
    for start in leftover.iter().copied() {
        if seen.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(node) = queue.pop_front() {
            component.push(node.to_string());
            for next in adjacency.get(node).into_iter().flatten().copied() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}
