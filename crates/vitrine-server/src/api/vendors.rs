use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vitrine_core::{Platform, SyncRunSummary, Vendor};

use crate::middleware::RequestId;

use super::{map_db_error, map_sync_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct VendorsQuery {
    /// Include inactive vendors.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct VendorItem {
    vendor_id: Uuid,
    name: String,
    slug: String,
    site_url: String,
    platform_hint: Option<Platform>,
    is_active: bool,
    last_synced_at: Option<DateTime<Utc>>,
}

impl From<Vendor> for VendorItem {
    fn from(vendor: Vendor) -> Self {
        Self {
            vendor_id: vendor.public_id,
            name: vendor.name,
            slug: vendor.slug,
            site_url: vendor.site_url,
            platform_hint: vendor.platform_hint,
            is_active: vendor.is_active,
            last_synced_at: vendor.last_synced_at,
        }
    }
}

pub(super) async fn list_vendors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<VendorsQuery>,
) -> Result<Json<ApiResponse<Vec<VendorItem>>>, ApiError> {
    let vendors = if query.all {
        vitrine_db::list_vendors(&state.pool).await
    } else {
        vitrine_db::list_active_vendors(&state.pool).await
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: vendors.into_iter().map(VendorItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Runs a sync for the vendor and answers once it has finished.
///
/// A run that ends FAILED is still a 202: the summary carries
/// `success: false` and the reason.
pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<SyncRunSummary>>), ApiError> {
    let vendor = vitrine_db::get_vendor_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| match e {
            vitrine_db::DbError::NotFound => {
                ApiError::new(req_id.0.clone(), "not_found", format!("vendor '{slug}' not found"))
            }
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    tracing::info!(vendor = %vendor.slug, request_id = %req_id.0, "sync requested");
    let summary = state
        .coordinator
        .start_sync(vendor.id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: summary,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
