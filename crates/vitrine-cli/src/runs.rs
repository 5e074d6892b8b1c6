use vitrine_core::SyncRun;

use crate::vendors::fmt_timestamp;

pub(crate) async fn run_list_runs(
    pool: &sqlx::PgPool,
    limit: i64,
    vendor_slug: Option<&str>,
) -> anyhow::Result<()> {
    let vendor_id = match vendor_slug {
        Some(slug) => Some(
            vitrine_db::get_vendor_by_slug(pool, slug)
                .await
                .map_err(|e| match e {
                    vitrine_db::DbError::NotFound => anyhow::anyhow!("vendor '{slug}' not found"),
                    other => other.into(),
                })?
                .id,
        ),
        None => None,
    };

    let runs = vitrine_db::list_sync_runs(pool, vendor_id, limit.clamp(1, 500)).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    println!(
        "{:<6} {:<7} {:<12} {:<17} {:>9} {:>7} {:>7} {:>7} {:>6}  MESSAGE",
        "ID", "VENDOR", "STATE", "STARTED", "PROCESSED", "CREATED", "UPDATED", "SKIPPED", "ERRORS"
    );
    for run in &runs {
        println!("{}", format_run_row(run));
    }
    Ok(())
}

pub(crate) fn format_run_row(run: &SyncRun) -> String {
    format!(
        "{:<6} {:<7} {:<12} {:<17} {:>9} {:>7} {:>7} {:>7} {:>6}  {}",
        run.id,
        run.vendor_id,
        run.state.as_str(),
        fmt_timestamp(run.started_at),
        format!("{}/{}", run.processed_items, run.total_items),
        run.created_count,
        run.updated_count,
        run.skipped_count,
        run.error_count,
        run.error_message.as_deref().unwrap_or("")
    )
}
