use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vitrine_core::{SyncRun, SyncState};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
    /// Vendor slug.
    pub vendor: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    id: i64,
    sync_run_id: Uuid,
    vendor_id: i64,
    state: SyncState,
    total_items: i32,
    processed_items: i32,
    created_count: i32,
    updated_count: i32,
    skipped_count: i32,
    error_count: i32,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SyncRun> for SyncRunItem {
    fn from(run: SyncRun) -> Self {
        Self {
            id: run.id,
            sync_run_id: run.public_id,
            vendor_id: run.vendor_id,
            state: run.state,
            total_items: run.total_items,
            processed_items: run.processed_items,
            created_count: run.created_count,
            updated_count: run.updated_count,
            skipped_count: run.skipped_count,
            error_count: run.error_count,
            error_message: run.error_message,
            started_at: run.started_at,
            completed_at: run.completed_at,
            created_at: run.created_at,
        }
    }
}

pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let vendor_id = match query.vendor.as_deref() {
        Some(slug) => Some(
            vitrine_db::get_vendor_by_slug(&state.pool, slug)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?
                .id,
        ),
        None => None,
    };

    let runs = vitrine_db::list_sync_runs(&state.pool, vendor_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: runs.into_iter().map(SyncRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Looks a run up by numeric id or by its public UUID.
pub(super) async fn get_sync_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SyncRunItem>>, ApiError> {
    let run = if let Ok(numeric) = id.parse::<i64>() {
        vitrine_db::get_sync_run(&state.pool, numeric).await
    } else if let Ok(public_id) = Uuid::parse_str(&id) {
        vitrine_db::get_sync_run_by_public_id(&state.pool, public_id).await
    } else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("'{id}' is not a sync run id"),
        ));
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: run.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
