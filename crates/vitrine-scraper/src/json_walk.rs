//! Bounded traversal of untrusted JSON embedded in pages.
//!
//! Page state blobs can be megabytes deep. Every walk is capped on depth and
//! on the total number of nodes visited.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_nodes: 5_000,
        }
    }
}

/// Collects every object satisfying `predicate`, depth-first in document order.
///
/// The walk does not descend into a matched object, so a product's nested
/// variants are not reported as separate products.
pub fn find_objects<'a, P>(root: &'a Value, limits: WalkLimits, predicate: P) -> Vec<&'a Map<String, Value>>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    let mut found = Vec::new();
    let mut visited = 0usize;
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited > limits.max_nodes {
            tracing::debug!(visited, "json walk stopped at node budget");
            break;
        }
        match node {
            Value::Object(map) => {
                if predicate(map) {
                    found.push(map);
                    continue;
                }
                if depth < limits.max_depth {
                    // Reverse so the stack pops children in document order.
                    let children: Vec<&Value> = map.values().collect();
                    stack.extend(children.into_iter().rev().map(|v| (v, depth + 1)));
                }
            }
            Value::Array(items) => {
                if depth < limits.max_depth {
                    stack.extend(items.iter().rev().map(|v| (v, depth + 1)));
                }
            }
            _ => {}
        }
    }

    found
}

/// Returns the first value stored under `key` anywhere in the tree.
pub fn find_key<'a>(root: &'a Value, key: &str, limits: WalkLimits) -> Option<&'a Value> {
    let mut visited = 0usize;
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited > limits.max_nodes {
            return None;
        }
        match node {
            Value::Object(map) => {
                if let Some(hit) = map.get(key) {
                    return Some(hit);
                }
                if depth < limits.max_depth {
                    let children: Vec<&Value> = map.values().collect();
                    stack.extend(children.into_iter().rev().map(|v| (v, depth + 1)));
                }
            }
            Value::Array(items) if depth < limits.max_depth => {
                stack.extend(items.iter().rev().map(|v| (v, depth + 1)));
            }
            _ => {}
        }
    }

    None
}
