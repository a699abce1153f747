//! Route definitions.

use axum::Router;
use axum::routing::get;

use crate::handlers::{availability, driver_ws, fleet_ws, health};
use crate::state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let ws_routes = Router::new()
        .route("/drivers/{tenant_id}/{driver_id}", get(driver_ws::driver_channel))
        .route("/fleet/{tenant_id}", get(fleet_ws::tenant_channel))
        .route(
            "/fleet/{tenant_id}/drivers/{driver_id}",
            get(fleet_ws::driver_channel),
        );

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route(
            "/tenants/{tenant_id}/availability",
            get(availability::nearest_available),
        );

    Router::new()
        .nest("/ws", ws_routes)
        .nest("/api", api_routes)
        .with_state(state)
}
