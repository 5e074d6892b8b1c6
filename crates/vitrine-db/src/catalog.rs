//! Vendor-partitioned product catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use vitrine_core::{CatalogFields, CatalogRecord, NewCatalogRecord};

use crate::DbError;

const CATALOG_COLUMNS: &str = "id, vendor_id, external_id, name, price, currency, description, \
     in_stock, image_url, image_urls, product_url, sku, brand, category, variants, weight, \
     dimensions, attributes, quality_score, is_complete, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogRow {
    pub id: i64,
    pub vendor_id: i64,
    pub external_id: String,
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
    pub variants: Option<serde_json::Value>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub attributes: Option<serde_json::Value>,
    pub quality_score: i16,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CatalogRow> for CatalogRecord {
    fn from(row: CatalogRow) -> Self {
        CatalogRecord {
            id: row.id,
            vendor_id: row.vendor_id,
            external_id: row.external_id,
            fields: CatalogFields {
                name: row.name,
                price: row.price,
                currency: row.currency,
                description: row.description,
                in_stock: row.in_stock,
                image_url: row.image_url,
                image_urls: row.image_urls,
                product_url: row.product_url,
                sku: row.sku,
                brand: row.brand,
                category: row.category,
                variants: row.variants,
                weight: row.weight,
                dimensions: row.dimensions,
                attributes: row.attributes,
                quality_score: row.quality_score,
                is_complete: row.is_complete,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Look up a product by its vendor-scoped external id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_catalog_product(
    pool: &PgPool,
    vendor_id: i64,
    external_id: &str,
) -> Result<Option<CatalogRecord>, DbError> {
    let row = sqlx::query_as::<_, CatalogRow>(&format!(
        "SELECT {CATALOG_COLUMNS} FROM catalog_products \
         WHERE vendor_id = $1 AND external_id = $2"
    ))
    .bind(vendor_id)
    .bind(external_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(CatalogRecord::from))
}

/// Insert a new catalog product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure, including a unique violation when
/// `(vendor_id, external_id)` already exists.
pub async fn create_catalog_product(
    pool: &PgPool,
    record: &NewCatalogRecord,
) -> Result<CatalogRecord, DbError> {
    let f = &record.fields;
    let row = sqlx::query_as::<_, CatalogRow>(&format!(
        "INSERT INTO catalog_products (vendor_id, external_id, name, price, currency, \
             description, in_stock, image_url, image_urls, product_url, sku, brand, category, \
             variants, weight, dimensions, attributes, quality_score, is_complete) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
         RETURNING {CATALOG_COLUMNS}"
    ))
    .bind(record.vendor_id)
    .bind(&record.external_id)
    .bind(&f.name)
    .bind(f.price)
    .bind(&f.currency)
    .bind(&f.description)
    .bind(f.in_stock)
    .bind(&f.image_url)
    .bind(&f.image_urls)
    .bind(&f.product_url)
    .bind(&f.sku)
    .bind(&f.brand)
    .bind(&f.category)
    .bind(&f.variants)
    .bind(&f.weight)
    .bind(&f.dimensions)
    .bind(&f.attributes)
    .bind(f.quality_score)
    .bind(f.is_complete)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Update an existing product in place.
///
/// `name`, `price`, `description`, `in_stock`, `image_url`, `product_url`
/// and the quality columns are always written. The remaining fields keep
/// their stored value when the incoming one is absent, and `image_urls`
/// only changes when the incoming list is non-empty.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`.
pub async fn update_catalog_product(
    pool: &PgPool,
    id: i64,
    fields: &CatalogFields,
) -> Result<CatalogRecord, DbError> {
    let row = sqlx::query_as::<_, CatalogRow>(&format!(
        "UPDATE catalog_products SET \
             name = $2, \
             price = $3, \
             description = $4, \
             in_stock = $5, \
             image_url = $6, \
             product_url = $7, \
             quality_score = $8, \
             is_complete = $9, \
             image_urls = CASE WHEN cardinality($10::text[]) > 0 THEN $10 ELSE image_urls END, \
             currency = COALESCE($11, currency), \
             sku = COALESCE($12, sku), \
             brand = COALESCE($13, brand), \
             category = COALESCE($14, category), \
             variants = COALESCE($15, variants), \
             weight = COALESCE($16, weight), \
             dimensions = COALESCE($17, dimensions), \
             attributes = COALESCE($18, attributes), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CATALOG_COLUMNS}"
    ))
    .bind(id)
    .bind(&fields.name)
    .bind(fields.price)
    .bind(&fields.description)
    .bind(fields.in_stock)
    .bind(&fields.image_url)
    .bind(&fields.product_url)
    .bind(fields.quality_score)
    .bind(fields.is_complete)
    .bind(&fields.image_urls)
    .bind(&fields.currency)
    .bind(&fields.sku)
    .bind(&fields.brand)
    .bind(&fields.category)
    .bind(&fields.variants)
    .bind(&fields.weight)
    .bind(&fields.dimensions)
    .bind(&fields.attributes)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row.into())
}

/// Products of one vendor, most recently updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_catalog_products(
    pool: &PgPool,
    vendor_id: i64,
    limit: i64,
) -> Result<Vec<CatalogRecord>, DbError> {
    let rows = sqlx::query_as::<_, CatalogRow>(&format!(
        "SELECT {CATALOG_COLUMNS} FROM catalog_products \
         WHERE vendor_id = $1 \
         ORDER BY updated_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(vendor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CatalogRecord::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_catalog_products(pool: &PgPool, vendor_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM catalog_products WHERE vendor_id = $1",
    )
    .bind(vendor_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
