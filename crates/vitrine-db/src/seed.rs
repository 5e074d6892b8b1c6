use sqlx::PgPool;
use vitrine_core::VendorConfig;

use crate::DbError;

/// Upsert vendors from config into the database, keyed by slug.
///
/// Returns the number of vendors processed (inserted or updated). All
/// upserts run inside a single transaction; if any fails the batch is
/// rolled back. `last_synced_at` is never touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_vendors(pool: &PgPool, vendors: &[VendorConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for vendor in vendors {
        let slug = vendor.slug();
        let platform_hint = vendor.platform.map(|p| p.as_str());

        sqlx::query(
            "INSERT INTO vendors (name, slug, site_url, platform_hint, notes, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 site_url = EXCLUDED.site_url, \
                 platform_hint = EXCLUDED.platform_hint, \
                 notes = EXCLUDED.notes, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW()",
        )
        .bind(&vendor.name)
        .bind(&slug)
        .bind(vendor.site_url.trim())
        .bind(platform_hint)
        .bind(&vendor.notes)
        .bind(vendor.active)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    tracing::info!(count, "seeded vendors");
    Ok(count)
}
