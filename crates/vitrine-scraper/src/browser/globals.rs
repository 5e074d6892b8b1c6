//! Static emulation of page globals.
//!
//! Storefronts publish their state through inline assignments such as
//! `window.ShopifyAnalytics = {...}` or `var meta = {...}`. Without a JS
//! engine we scan inline scripts for those assignments and rebuild a tree of
//! the JSON-literal right-hand sides, keyed by dotted path. Assignments whose
//! value is not a JSON literal still register the path with an empty object,
//! so presence checks (`typeof Shopify !== "undefined"`) keep working.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static INLINE_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").expect("valid inline script regex")
});

static SCRIPT_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bsrc\s*="#).expect("valid src regex"));

static SCRIPT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\btype\s*=\s*["']([^"']+)["']"#).expect("valid type regex")
});

static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s;{}(,])(?:window\.|self\.|var\s+|let\s+|const\s+)?([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*=",
    )
    .expect("valid assignment regex")
});

/// Upper bound on assignments considered per page.
const MAX_ASSIGNMENTS: usize = 2_000;

/// Builds the global tree for an HTML document.
#[must_use]
pub fn scan_globals(html: &str) -> Value {
    let mut root = Map::new();
    let mut seen = 0usize;

    for cap in INLINE_SCRIPT_RE.captures_iter(html) {
        let attrs = cap.get(1).map_or("", |m| m.as_str());
        if SCRIPT_SRC_RE.is_match(attrs) || !is_javascript(attrs) {
            continue;
        }
        let Some(body) = cap.get(2).map(|m| m.as_str()) else {
            continue;
        };

        for assign in ASSIGNMENT_RE.captures_iter(body) {
            seen += 1;
            if seen > MAX_ASSIGNMENTS {
                tracing::debug!("global scan stopped at assignment cap");
                return Value::Object(root);
            }
            let (Some(path), Some(whole)) = (assign.get(1), assign.get(0)) else {
                continue;
            };
            let rest = &body[whole.end()..];
            // `==`, `===` and `=>` are not assignments.
            if rest.starts_with('=') || rest.starts_with('>') {
                continue;
            }
            let path = path.as_str().trim_start_matches("window.");
            let value = parse_json_prefix(rest);
            insert_path(&mut root, path, value);
        }
    }

    Value::Object(root)
}

/// Looks up a dotted path in a global tree. Missing segments yield `Null`.
#[must_use]
pub fn lookup_path(tree: &Value, path: &str) -> Value {
    let mut node = tree;
    for segment in path.trim().trim_start_matches("window.").split('.') {
        match node.get(segment) {
            Some(next) => node = next,
            None => return Value::Null,
        }
    }
    node.clone()
}

fn is_javascript(attrs: &str) -> bool {
    match SCRIPT_TYPE_RE.captures(attrs).and_then(|c| c.get(1)) {
        None => true,
        Some(t) => {
            let t = t.as_str().to_ascii_lowercase();
            t.contains("javascript") || t == "module"
        }
    }
}

/// Parses the first JSON value at the start of `input`, if it is one.
fn parse_json_prefix(input: &str) -> Option<Value> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;
    if !matches!(first, '{' | '[' | '"') {
        return None;
    }
    serde_json::Deserializer::from_str(trimmed)
        .into_iter::<Value>()
        .next()
        .and_then(Result::ok)
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Option<Value>) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        let entry = node
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        node = next;
    }

    match value {
        Some(Value::Object(incoming)) => {
            let slot = node
                .entry((*last).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(existing) = slot {
                for (k, v) in incoming {
                    existing.insert(k, v);
                }
            } else {
                *slot = Value::Object(incoming);
            }
        }
        Some(other) => {
            node.insert((*last).to_string(), other);
        }
        None => {
            node.entry((*last).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scans_window_and_var_assignments() {
        let html = r#"
            <script>
              window.ShopifyAnalytics = window.ShopifyAnalytics || {};
              var meta = {"product":{"id":42,"vendor":"Lune"}};
              window.Shopify = window.Shopify || {};
              Shopify.shop = "lune.myshopify.com";
            </script>
        "#;
        let tree = scan_globals(html);
        assert_eq!(lookup_path(&tree, "meta.product.id"), json!(42));
        assert_eq!(lookup_path(&tree, "Shopify.shop"), json!("lune.myshopify.com"));
        assert!(lookup_path(&tree, "ShopifyAnalytics").is_object());
        assert!(lookup_path(&tree, "Magento").is_null());
    }

    #[test]
    fn ignores_comparisons_and_arrow_functions() {
        let html = r"<script>if (a == 1) { b = () => 2; }</script>";
        let tree = scan_globals(html);
        assert!(lookup_path(&tree, "a").is_null());
        assert!(lookup_path(&tree, "b").is_object());
    }

    #[test]
    fn skips_external_and_json_scripts() {
        let html = r#"
            <script src="/app.js">var hidden = {"x":1};</script>
            <script type="application/ld+json">{"@type":"Product"}</script>
            <script type="text/javascript">var shown = {"x":2};</script>
        "#;
        let tree = scan_globals(html);
        assert!(lookup_path(&tree, "hidden").is_null());
        assert_eq!(lookup_path(&tree, "shown.x"), json!(2));
    }

    #[test]
    fn later_object_assignment_merges_keys() {
        let html = r#"<script>
            window.__INITIAL_STATE__ = {"cart":{}};
            window.__INITIAL_STATE__ = {"product":{"name":"Bol"}};
        </script>"#;
        let tree = scan_globals(html);
        assert!(lookup_path(&tree, "__INITIAL_STATE__.cart").is_object());
        assert_eq!(
            lookup_path(&tree, "__INITIAL_STATE__.product.name"),
            json!("Bol")
        );
    }
}
