//! Driver channel: admission before upgrade, then one ack per position.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_realtime::RealtimeEngine;
use fleetpulse_realtime::message::PositionEnvelope;
use fleetpulse_realtime::message::builder::build_ack_error;
use fleetpulse_realtime::message::serializer::serialize_envelope;

use crate::dto::request::DriverChannelQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws/drivers/{tenant_id}/{driver_id}?frequency= (driver channel)
///
/// A refused driver gets a plain HTTP error and is never upgraded.
pub async fn driver_channel(
    State(state): State<AppState>,
    Path((tenant_id, driver_id)): Path<(TenantId, DriverId)>,
    Query(query): Query<DriverChannelQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    state
        .realtime
        .connect_driver(tenant_id, driver_id, query.frequency)
        .await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            state.realtime.disconnect_driver(tenant_id, driver_id);
            return Ok(rejection.into_response());
        }
    };

    let max_bytes = state.realtime.config().max_message_bytes;
    let failed_state = state.clone();
    Ok(ws
        .max_message_size(max_bytes)
        .on_failed_upgrade(move |e| {
            warn!(driver_id = %driver_id, error = %e, "Driver upgrade failed");
            failed_state.realtime.disconnect_driver(tenant_id, driver_id);
        })
        .on_upgrade(move |socket| run_driver_socket(state, tenant_id, driver_id, socket)))
}

/// Acknowledgement for one inbound frame; control frames get none.
async fn ack_frame(
    engine: &RealtimeEngine,
    tenant_id: TenantId,
    driver_id: DriverId,
    frame: &Message,
) -> Option<PositionEnvelope> {
    match frame {
        Message::Text(text) => Some(
            engine
                .handle_driver_message(tenant_id, driver_id, text.as_str())
                .await,
        ),
        Message::Binary(_) => {
            debug!(driver_id = %driver_id, "Binary frame refused");
            Some(build_ack_error("Unsupported frame: send JSON text"))
        }
        _ => None,
    }
}

/// Handles an established driver connection.
async fn run_driver_socket(
    state: AppState,
    tenant_id: TenantId,
    driver_id: DriverId,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut shutdown = state.realtime.shutdown_receiver();

    info!(driver_id = %driver_id, tenant_id = %tenant_id, "Driver channel open");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(frame)) => {
                    let Some(ack) = ack_frame(&state.realtime, tenant_id, driver_id, &frame).await
                    else {
                        continue;
                    };
                    let payload = match serialize_envelope(&ack) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(driver_id = %driver_id, error = %e, "Failed to encode ack");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    debug!(driver_id = %driver_id, error = %e, "Driver socket error");
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    state.realtime.disconnect_driver(tenant_id, driver_id);
}
