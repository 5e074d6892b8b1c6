use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vitrine_core::{Platform, Vendor};

use crate::DbError;

const VENDOR_COLUMNS: &str =
    "id, public_id, name, slug, site_url, platform_hint, notes, is_active, last_synced_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub site_url: String,
    pub platform_hint: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl TryFrom<VendorRow> for Vendor {
    type Error = DbError;

    fn try_from(row: VendorRow) -> Result<Self, Self::Error> {
        let platform_hint = row
            .platform_hint
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()
            .map_err(DbError::CorruptRow)?;
        Ok(Vendor {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            slug: row.slug,
            site_url: row.site_url,
            platform_hint,
            is_active: row.is_active,
            last_synced_at: row.last_synced_at,
        })
    }
}

fn into_vendors(rows: Vec<VendorRow>) -> Result<Vec<Vendor>, DbError> {
    rows.into_iter().map(Vendor::try_from).collect()
}

/// List active vendors ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_active_vendors(pool: &PgPool) -> Result<Vec<Vendor>, DbError> {
    let rows = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE is_active = true ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    into_vendors(rows)
}

/// List every vendor, active or not, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_vendors(pool: &PgPool) -> Result<Vec<Vendor>, DbError> {
    let rows = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    into_vendors(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no vendor has `id`.
pub async fn get_vendor(pool: &PgPool, id: i64) -> Result<Vendor, DbError> {
    let row = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Vendor::try_from(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no vendor has `slug`.
pub async fn get_vendor_by_slug(pool: &PgPool, slug: &str) -> Result<Vendor, DbError> {
    let row = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Vendor::try_from(row)
}

/// Record a successful synchronization time on the vendor.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no vendor has `id`.
pub async fn set_vendor_last_synced(
    pool: &PgPool,
    id: i64,
    synced_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE vendors SET last_synced_at = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(synced_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
