use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::products::ExtractedProduct;

/// The mutable field set of a catalog record.
///
/// On update, `name`, `price`, `description`, `in_stock`, `image_url` and
/// `product_url` are always written. The remaining optional fields are only
/// written when `Some`, so a sparse extraction never blanks out data a
/// previous run stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFields {
    pub name: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub in_stock: Option<bool>,
    pub image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub product_url: Option<String>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Serialized `ProductVariant` list; `None` when the product has none.
    pub variants: Option<serde_json::Value>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub attributes: Option<serde_json::Value>,
    pub quality_score: i16,
    pub is_complete: bool,
}

impl CatalogFields {
    /// Converts a scored product into the catalog field set.
    #[must_use]
    pub fn from_product(product: &ExtractedProduct, is_complete: bool) -> Self {
        let variants = if product.variants.is_empty() {
            None
        } else {
            serde_json::to_value(&product.variants).ok()
        };
        let attributes = if product.attributes.is_empty() {
            None
        } else {
            serde_json::to_value(&product.attributes).ok()
        };

        Self {
            name: product.name.clone(),
            price: product.price,
            currency: product.currency.clone(),
            description: product.description.clone(),
            in_stock: product.available,
            image_url: product.image_url.clone(),
            image_urls: product.image_urls.clone(),
            product_url: product.product_url.clone(),
            sku: product.sku.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            variants,
            weight: product.weight.clone(),
            dimensions: product.dimensions.clone(),
            attributes,
            quality_score: i16::from(product.quality_score),
            is_complete,
        }
    }
}

/// Input for creating a catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogRecord {
    pub vendor_id: i64,
    pub external_id: String,
    pub fields: CatalogFields,
}

/// A persisted catalog entry, keyed by `(vendor_id, external_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub vendor_id: i64,
    pub external_id: String,
    pub fields: CatalogFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Applies `incoming` with update semantics: required and always-written
    /// fields are replaced, optional enrichment fields only when present.
    pub fn apply_update(&mut self, incoming: CatalogFields) {
        let current = &mut self.fields;
        current.name = incoming.name;
        current.price = incoming.price;
        current.description = incoming.description;
        current.in_stock = incoming.in_stock;
        current.image_url = incoming.image_url;
        current.product_url = incoming.product_url;
        current.quality_score = incoming.quality_score;
        current.is_complete = incoming.is_complete;
        if !incoming.image_urls.is_empty() {
            current.image_urls = incoming.image_urls;
        }
        replace_if_some(&mut current.currency, incoming.currency);
        replace_if_some(&mut current.sku, incoming.sku);
        replace_if_some(&mut current.brand, incoming.brand);
        replace_if_some(&mut current.category, incoming.category);
        replace_if_some(&mut current.variants, incoming.variants);
        replace_if_some(&mut current.weight, incoming.weight);
        replace_if_some(&mut current.dimensions, incoming.dimensions);
        replace_if_some(&mut current.attributes, incoming.attributes);
        self.updated_at = Utc::now();
    }
}

fn replace_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
