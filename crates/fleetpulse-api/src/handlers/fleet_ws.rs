//! Observer channels for a whole tenant or a single driver.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_realtime::message::PositionEnvelope;
use fleetpulse_realtime::message::serializer::serialize_envelope;
use fleetpulse_realtime::registry::ObserverSession;
use fleetpulse_realtime::ChannelObserver;

use crate::dto::request::ObserverChannelQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// How long a closing observer gets to flush queued envelopes.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// GET /ws/fleet/{tenant_id}?role= (every driver of a tenant)
pub async fn tenant_channel(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<ObserverChannelQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let (sink, outbound) = ChannelObserver::new(state.realtime.config().observer_buffer_size);
    let session = state
        .realtime
        .attach_tenant_observer(tenant_id, query.role, sink)
        .await?;
    Ok(upgrade(state, ws, session, outbound))
}

/// GET /ws/fleet/{tenant_id}/drivers/{driver_id}?role=&frequency= (one driver)
pub async fn driver_channel(
    State(state): State<AppState>,
    Path((tenant_id, driver_id)): Path<(TenantId, DriverId)>,
    Query(query): Query<ObserverChannelQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let (sink, outbound) = ChannelObserver::new(state.realtime.config().observer_buffer_size);
    let session = state
        .realtime
        .attach_driver_observer(tenant_id, driver_id, query.role, query.frequency, sink)
        .await?;
    Ok(upgrade(state, ws, session, outbound))
}

/// Upgrades an already attached observer, detaching it if the upgrade fails.
fn upgrade(
    state: AppState,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    session: Arc<ObserverSession>,
    outbound: mpsc::Receiver<PositionEnvelope>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            detach(&state, &session);
            return rejection.into_response();
        }
    };

    let failed_state = state.clone();
    let failed_session = Arc::clone(&session);
    ws.on_failed_upgrade(move |e| {
        warn!(observer_id = %failed_session.id, error = %e, "Observer upgrade failed");
        detach(&failed_state, &failed_session);
    })
    .on_upgrade(move |socket| run_observer_socket(state, session, outbound, socket))
}

fn detach(state: &AppState, session: &ObserverSession) {
    state
        .realtime
        .detach(session.tenant_id, session.watched_driver, session.id);
}

/// Forwards queued envelopes until either side goes away.
async fn run_observer_socket(
    state: AppState,
    session: Arc<ObserverSession>,
    mut outbound: mpsc::Receiver<PositionEnvelope>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut shutdown = state.realtime.shutdown_receiver();
    let observer_id = session.id;

    info!(
        observer_id = %observer_id,
        tenant_id = %session.tenant_id,
        driver_id = ?session.watched_driver,
        "Observer channel open"
    );

    // Spawn outbound message forwarder
    let mut forwarder = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let payload = match serialize_envelope(&envelope) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(observer_id = %observer_id, error = %e, "Failed to encode envelope");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut forwarder => break,
            _ = shutdown.recv() => break,
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                // Observers only listen.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(observer_id = %observer_id, error = %e, "Observer socket error");
                    break;
                }
            }
        }
    }

    detach(&state, &session);
    // The sink is closed now, so the forwarder drains and exits on its own.
    if !forwarder.is_finished()
        && tokio::time::timeout(CLOSE_GRACE, &mut forwarder).await.is_err()
    {
        forwarder.abort();
    }

    info!(observer_id = %observer_id, "Observer channel closed");
}
