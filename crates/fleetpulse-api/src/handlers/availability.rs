//! Nearest available drivers.

use axum::Json;
use axum::extract::{Path, Query, State};

use fleetpulse_core::types::TenantId;
use fleetpulse_realtime::AvailableDriver;

use crate::dto::request::AvailabilityQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/tenants/{tenant_id}/availability?address=&radius_km=&limit=
pub async fn nearest_available(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<Vec<AvailableDriver>>>, ApiError> {
    let drivers = state
        .realtime
        .nearest_available(tenant_id, &query.address, query.radius_km, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(drivers)))
}
