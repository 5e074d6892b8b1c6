//! Extraction dispatcher.
//!
//! Each platform strategy lists its tiers in priority order. Tiers run one
//! at a time through [`first_success`]: the hard gate is applied to each
//! tier's output and the first tier with a surviving product wins. Results
//! from different tiers are never merged.

mod dom;
mod generic;
mod json_product;
mod magento;
mod page_kind;
mod prestashop;
mod script_json;
mod shopify;
mod woocommerce;

use std::str::FromStr;

use reqwest::Url;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use vitrine_core::{ExtractedProduct, Platform, SiteProfile};

use crate::classify::CLASSIFIER_GLOBALS;
use crate::error::ScraperError;
use crate::fields::{self, compile};
use crate::json_walk::WalkLimits;
use crate::snapshot::PageSnapshot;

pub use page_kind::PageKindWeights;

/// Output of one extraction tier, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionTier {
    /// Platform-native embedded data.
    StructuredData(Vec<ExtractedProduct>),
    /// `ld+json` / `application/json` script blocks.
    ScriptJson(Vec<ExtractedProduct>),
    /// DOM heuristics over product containers.
    DomHeuristic(Vec<ExtractedProduct>),
    NotFound,
}

impl ExtractionTier {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionTier::StructuredData(_) => "structured_data",
            ExtractionTier::ScriptJson(_) => "script_json",
            ExtractionTier::DomHeuristic(_) => "dom_heuristic",
            ExtractionTier::NotFound => "not_found",
        }
    }

    #[must_use]
    pub fn into_products(self) -> Vec<ExtractedProduct> {
        match self {
            ExtractionTier::StructuredData(v)
            | ExtractionTier::ScriptJson(v)
            | ExtractionTier::DomHeuristic(v) => v,
            ExtractionTier::NotFound => Vec::new(),
        }
    }

    /// Drops products failing the hard gate; an emptied tier becomes `NotFound`.
    #[must_use]
    fn gated(self) -> Self {
        let wrap: fn(Vec<ExtractedProduct>) -> Self = match &self {
            ExtractionTier::StructuredData(_) => ExtractionTier::StructuredData,
            ExtractionTier::ScriptJson(_) => ExtractionTier::ScriptJson,
            ExtractionTier::DomHeuristic(_) => ExtractionTier::DomHeuristic,
            ExtractionTier::NotFound => return ExtractionTier::NotFound,
        };
        let kept: Vec<ExtractedProduct> = self
            .into_products()
            .into_iter()
            .filter(ExtractedProduct::passes_hard_gate)
            .collect();
        if kept.is_empty() {
            ExtractionTier::NotFound
        } else {
            wrap(kept)
        }
    }
}

/// Runs `tiers` in order and returns the first gated result with at least
/// one product. Later tiers are not evaluated.
pub fn first_success<I, F>(tiers: I) -> ExtractionTier
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> ExtractionTier,
{
    for tier in tiers {
        let result = tier().gated();
        if !matches!(result, ExtractionTier::NotFound) {
            return result;
        }
    }
    ExtractionTier::NotFound
}

/// Whether the page is treated as one product or as a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageMode {
    /// Let the platform strategy decide from the page.
    #[default]
    Auto,
    SingleProduct,
    Listing,
}

impl FromStr for PageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(PageMode::Auto),
            "single" | "single_product" | "product" => Ok(PageMode::SingleProduct),
            "listing" | "list" => Ok(PageMode::Listing),
            other => Err(format!("unknown page mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub mode: PageMode,
    /// Upper bound on DOM containers considered by the heuristic tier.
    pub max_dom_candidates: usize,
    pub page_kind: PageKindWeights,
    pub walk: WalkLimits,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mode: PageMode::Auto,
            max_dom_candidates: 20,
            page_kind: PageKindWeights::default(),
            walk: WalkLimits::default(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn single_product(&self) -> Self {
        Self {
            mode: PageMode::SingleProduct,
            ..self.clone()
        }
    }
}

/// Everything a tier needs to read one page.
pub(crate) struct PageContext<'a> {
    pub snapshot: &'a PageSnapshot,
    pub document: &'a Html,
    pub base: Url,
    pub options: &'a ExtractOptions,
    /// Resolved page mode; never `Auto`.
    pub single: bool,
    /// Currency declared once for the whole page, if any.
    pub page_currency: Option<String>,
}

impl PageContext<'_> {
    pub fn root(&self) -> ElementRef<'_> {
        self.document.root_element()
    }

    pub fn global(&self, expression: &str) -> Option<&Value> {
        self.snapshot.global(expression)
    }

    /// Product and page links.
    pub fn resolve_link(&self, raw: &str) -> Option<String> {
        fields::resolve_link(raw, &self.base)
    }

    /// Image sources; placeholders resolve to `None`.
    pub fn resolve_image(&self, raw: &str) -> Option<String> {
        fields::resolve_image(raw, &self.base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    Native,
    Script,
    Dom,
}

/// Per-platform extraction behaviour.
pub(crate) trait PlatformStrategy: Sync {
    fn platform(&self) -> Platform;

    /// Global expressions captured with every snapshot for this platform.
    fn global_expressions(&self) -> &'static [&'static str] {
        &[]
    }

    fn tiers(&self) -> &'static [Tier] {
        &[Tier::Native, Tier::Script, Tier::Dom]
    }

    /// Platform-specific single-product markers used in [`PageMode::Auto`].
    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool;

    /// Tier A: platform-native embedded data.
    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct>;

    /// Listing container selectors tried before the generic ones.
    fn container_selectors(&self) -> &'static [Selector] {
        &[]
    }
}

static SHOPIFY: shopify::ShopifyStrategy = shopify::ShopifyStrategy;
static WOOCOMMERCE: woocommerce::WooCommerceStrategy = woocommerce::WooCommerceStrategy;
static MAGENTO: magento::MagentoStrategy = magento::MagentoStrategy;
static PRESTASHOP: prestashop::PrestaShopStrategy = prestashop::PrestaShopStrategy;
static GENERIC: generic::GenericStrategy = generic::GenericStrategy;

pub(crate) fn strategy_for(platform: Platform) -> &'static dyn PlatformStrategy {
    match platform {
        Platform::Shopify => &SHOPIFY,
        Platform::WooCommerce => &WOOCOMMERCE,
        Platform::Magento => &MAGENTO,
        Platform::PrestaShop => &PRESTASHOP,
        Platform::Generic => &GENERIC,
    }
}

/// Every global expression any classifier or strategy reads, deduplicated.
#[must_use]
pub fn all_global_expressions() -> Vec<&'static str> {
    let mut expressions: Vec<&'static str> = CLASSIFIER_GLOBALS.to_vec();
    for platform in Platform::SIGNATURE_ORDER
        .into_iter()
        .chain(std::iter::once(Platform::Generic))
    {
        for expression in strategy_for(platform).global_expressions() {
            if !expressions.contains(expression) {
                expressions.push(expression);
            }
        }
    }
    expressions
}

static PAGE_CURRENCY: std::sync::LazyLock<Vec<Selector>> = std::sync::LazyLock::new(|| {
    compile(&[
        "meta[itemprop=\"priceCurrency\"]",
        "meta[property=\"product:price:currency\"]",
        "meta[property=\"og:price:currency\"]",
        "[itemprop=\"priceCurrency\"]",
    ])
});

/// Extracts products from a captured page using the strategy for `profile`.
///
/// Every returned product passes the hard gate. An empty vector means no
/// tier found anything.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] when the snapshot URL cannot serve
/// as a base for resolving links.
pub fn extract_products(
    snapshot: &PageSnapshot,
    profile: &SiteProfile,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedProduct>, ScraperError> {
    let base = Url::parse(&snapshot.url).map_err(|e| ScraperError::InvalidUrl {
        url: snapshot.url.clone(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(&snapshot.html);
    let strategy = strategy_for(profile.platform);

    let page_currency = PAGE_CURRENCY
        .iter()
        .flat_map(|s| document.select(s))
        .find_map(|el| {
            el.value()
                .attr("content")
                .map(str::to_string)
                .or_else(|| Some(fields::element_text(el)))
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| c.len() == 3)
        });

    let mut ctx = PageContext {
        snapshot,
        document: &document,
        base,
        options,
        single: false,
        page_currency,
    };
    ctx.single = match options.mode {
        PageMode::SingleProduct => true,
        PageMode::Listing => false,
        PageMode::Auto => strategy.is_single_product_page(&ctx),
    };

    let ctx = &ctx;
    let result = first_success(strategy.tiers().iter().map(|tier| {
        move || match tier {
            Tier::Native => ExtractionTier::StructuredData(strategy.structured_data(ctx)),
            Tier::Script => ExtractionTier::ScriptJson(script_json::extract(ctx)),
            Tier::Dom => ExtractionTier::DomHeuristic(dom::extract(ctx, strategy.container_selectors())),
        }
    }));

    let tier = result.name();
    let mut products = result.into_products();
    if ctx.single {
        products.truncate(1);
    }
    for product in &mut products {
        finalize(product, ctx);
    }
    tracing::debug!(
        url = %snapshot.url,
        platform = %profile.platform,
        single = ctx.single,
        tier,
        count = products.len(),
        "extraction finished"
    );
    Ok(products)
}

/// Fills page-level defaults and derives variants from option axes.
fn finalize(product: &mut ExtractedProduct, ctx: &PageContext<'_>) {
    if product.currency.is_none() {
        product.currency.clone_from(&ctx.page_currency);
    }
    if ctx.single && product.product_url.is_none() {
        product.product_url = Some(ctx.snapshot.url.clone());
    }
    if product.image_url.is_none() {
        product.image_url = product.image_urls.first().cloned();
    }
    // Native variants only feed price and SKU lookups; without an option
    // axis the product has no variants.
    product.rederive_variants();
}

/// Sets the external id from the best available source.
pub(crate) fn assign_external_id(
    product: &mut ExtractedProduct,
    platform_id: Option<&str>,
    attribute_id: Option<&str>,
) {
    product.external_id = fields::resolve_external_id(
        platform_id,
        attribute_id,
        product.sku.as_deref(),
        product.product_url.as_deref(),
        &product.name,
        product.price,
    );
}

// ---------------------------------------------------------------------------
// JSON helpers shared by the structured tiers
// ---------------------------------------------------------------------------

/// String or number rendered as a trimmed, non-empty string.
pub(crate) fn json_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decimal from a JSON number or a displayed price string.
pub(crate) fn json_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
            .filter(|d| *d > Decimal::ZERO),
        Value::String(s) => fields::parse_price(s),
        _ => None,
    }
}

/// Text content of an HTML fragment, whitespace collapsed.
pub(crate) fn strip_html(raw: &str) -> Option<String> {
    let fragment = Html::parse_fragment(raw);
    let text = fields::collapse_whitespace(&fragment.root_element().text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Builds a listing-mode context over `html` for unit tests.
#[cfg(test)]
pub(crate) fn with_test_context<R>(
    url: &str,
    html: &str,
    run: impl FnOnce(&PageContext<'_>) -> R,
) -> R {
    let snapshot = PageSnapshot::from_html(url, html);
    let document = Html::parse_document(html);
    let options = ExtractOptions::default();
    let ctx = PageContext {
        snapshot: &snapshot,
        document: &document,
        base: Url::parse(url).expect("test url"),
        options: &options,
        single: false,
        page_currency: None,
    };
    run(&ctx)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
