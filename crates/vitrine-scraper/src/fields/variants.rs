//! Color and size option discovery.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::{attr, compile, element_text};

const MAX_OPTION_CHARS: usize = 40;

const COLOR_LABELS: &[&str] = &[
    "color", "colour", "couleur", "coloris", "farbe", "colore", "kleur", "cor",
];
const SIZE_LABELS: &[&str] = &[
    "size", "taille", "größe", "groesse", "grosse", "taglia", "talla", "maat", "tamanho",
    "pointure",
];
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "choose", "choisir", "choisissez", "select", "sélectionn", "selectionn", "veuillez",
    "please", "--",
];

/// Option axis a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Color,
    Size,
}

/// Classifies an option label such as `"Couleur"` or `"attribute_pa_taille"`.
#[must_use]
pub fn axis_of(label: &str) -> Option<Axis> {
    let lower = label.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let matches_any = |labels: &[&str]| words.iter().any(|w| labels.contains(w));
    if matches_any(COLOR_LABELS) {
        Some(Axis::Color)
    } else if matches_any(SIZE_LABELS) {
        Some(Axis::Size)
    } else {
        None
    }
}

struct AxisSelectors {
    swatches: Vec<Selector>,
    selects: Vec<Selector>,
}

static COLOR_SELECTORS: LazyLock<AxisSelectors> = LazyLock::new(|| AxisSelectors {
    swatches: compile(&[
        ".swatch-color [data-value]",
        ".color-swatch",
        ".swatch--color",
        "[data-option-name=\"color\"] [data-value]",
        "[data-option-name=\"couleur\"] [data-value]",
        ".color-variant",
        ".product-variants .color",
    ]),
    selects: compile(&[
        "select[name*=\"color\"] option",
        "select[name*=\"couleur\"] option",
        "select[name*=\"colour\"] option",
        "select[id*=\"color\"] option",
        "select[id*=\"couleur\"] option",
    ]),
});

static SIZE_SELECTORS: LazyLock<AxisSelectors> = LazyLock::new(|| AxisSelectors {
    swatches: compile(&[
        ".swatch-size [data-value]",
        ".size-swatch",
        ".swatch--size",
        "[data-option-name=\"size\"] [data-value]",
        "[data-option-name=\"taille\"] [data-value]",
        ".size-variant",
    ]),
    selects: compile(&[
        "select[name*=\"size\"] option",
        "select[name*=\"taille\"] option",
        "select[id*=\"size\"] option",
        "select[id*=\"taille\"] option",
        "select[name*=\"pointure\"] option",
    ]),
});

/// Labelled containers whose label decides the axis.
static LABELLED_GROUPS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&["fieldset", ".swatch-attribute", ".variations tr", ".product-variants-item"]));
static GROUP_LABEL: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&["legend", ".swatch-attribute-label", "th label", "label", ".control-label"])
});
static GROUP_VALUES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "option",
        "[data-option-value]",
        "[data-value]",
        ".swatch-option",
        "input[type=\"radio\"]",
    ])
});

/// Distinct color names found in `scope`.
#[must_use]
pub fn extract_colors(scope: ElementRef<'_>) -> Vec<String> {
    extract_axis(scope, Axis::Color)
}

/// Distinct size labels found in `scope`.
#[must_use]
pub fn extract_sizes(scope: ElementRef<'_>) -> Vec<String> {
    extract_axis(scope, Axis::Size)
}

fn extract_axis(scope: ElementRef<'_>, axis: Axis) -> Vec<String> {
    let selectors = match axis {
        Axis::Color => &*COLOR_SELECTORS,
        Axis::Size => &*SIZE_SELECTORS,
    };

    let swatches = collect_values(selectors.swatches.iter().flat_map(|s| scope.select(s)));
    if !swatches.is_empty() {
        return swatches;
    }
    let selects = collect_values(selectors.selects.iter().flat_map(|s| scope.select(s)));
    if !selects.is_empty() {
        return selects;
    }

    for group_selector in LABELLED_GROUPS.iter() {
        for group in scope.select(group_selector) {
            let label = GROUP_LABEL
                .iter()
                .find_map(|s| group.select(s).next())
                .map(element_text)
                .or_else(|| attr(group, "data-attribute-code").map(str::to_string));
            if label.as_deref().and_then(axis_of) != Some(axis) {
                continue;
            }
            let values = collect_values(GROUP_VALUES.iter().flat_map(|s| group.select(s)));
            if !values.is_empty() {
                return values;
            }
        }
    }
    Vec::new()
}

fn collect_values<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for el in elements {
        let Some(value) = option_value(el) else {
            continue;
        };
        if !values.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
            values.push(value);
        }
    }
    values
}

/// Text first, then `title`, then the value-carrying attributes.
fn option_value(el: ElementRef<'_>) -> Option<String> {
    let text = element_text(el);
    let raw = if text.is_empty() {
        attr(el, "title")
            .or_else(|| attr(el, "aria-label"))
            .or_else(|| attr(el, "data-value"))
            .or_else(|| attr(el, "data-option-value"))
            .or_else(|| attr(el, "value"))?
            .to_string()
    } else {
        text
    };
    let value = raw.trim().to_string();
    if value.is_empty() || value.chars().count() > MAX_OPTION_CHARS || is_placeholder(&value) {
        return None;
    }
    Some(value)
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDER_PREFIXES.iter().any(|p| lower.starts_with(p))
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn multilingual_axis_labels() {
        assert_eq!(axis_of("Couleur"), Some(Axis::Color));
        assert_eq!(axis_of("attribute_pa_taille"), Some(Axis::Size));
        assert_eq!(axis_of("Größe"), Some(Axis::Size));
        assert_eq!(axis_of("Matière"), None);
    }

    #[test]
    fn select_options_skip_placeholders() {
        let html = Html::parse_fragment(
            r#"<form><select name="attribute_taille">
                 <option value="">Choisir une option</option>
                 <option value="s">S</option>
                 <option value="m">M</option>
                 <option value="m2">m</option>
               </select></form>"#,
        );
        assert_eq!(extract_sizes(html.root_element()), vec!["S", "M"]);
        assert!(extract_colors(html.root_element()).is_empty());
    }

    #[test]
    fn swatches_win_over_selects() {
        let html = Html::parse_fragment(
            r#"<div>
                 <div class="swatch-color"><span data-value="rouge" title="Rouge"></span><span data-value="bleu" title="Bleu"></span></div>
                 <select name="color"><option>Vert</option></select>
               </div>"#,
        );
        assert_eq!(extract_colors(html.root_element()), vec!["Rouge", "Bleu"]);
    }

    #[test]
    fn labelled_fieldset_decides_axis() {
        let html = Html::parse_fragment(
            r#"<div>
                 <fieldset><legend>Pointure</legend>
                   <input type="radio" value="38"><input type="radio" value="39">
                 </fieldset>
               </div>"#,
        );
        assert_eq!(extract_sizes(html.root_element()), vec!["38", "39"]);
        assert!(extract_colors(html.root_element()).is_empty());
    }

    #[test]
    fn overlong_values_are_dropped() {
        let long = "x".repeat(41);
        let html = Html::parse_fragment(&format!(
            r#"<select name="size"><option>{long}</option><option>L</option></select>"#
        ));
        assert_eq!(extract_sizes(html.root_element()), vec!["L"]);
    }
}
