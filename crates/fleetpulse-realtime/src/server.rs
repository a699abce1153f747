//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use fleetpulse_admission::AdmissionController;
use fleetpulse_core::config::{AvailabilityConfig, RealtimeConfig};
use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, ObserverId, TenantId};
use fleetpulse_database::{FleetDirectory, PositionStore};
use fleetpulse_entity::ConnectionRecord;
use fleetpulse_geo::GeocodingProvider;

use crate::availability::{AvailabilitySearch, AvailableDriver};
use crate::broadcast::{BroadcastEngine, ResendScheduler};
use crate::message::builder::{build_ack, build_ack_error};
use crate::message::validator::parse_inbound;
use crate::message::{InboundMessage, PositionEnvelope};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::observer::ObserverSink;
use crate::presence::{PositionService, PresenceCache};
use crate::registry::{ObserverSession, SessionRegistry};

/// Live driver connection bookkeeping.
#[derive(Debug, Clone, Copy)]
struct DriverLink {
    tenant_id: TenantId,
    connections: usize,
}

/// Central real-time engine that coordinates presence, observers, and
/// admission for the transport layer.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Position reads and writes.
    pub positions: Arc<PositionService>,
    /// Observer registry.
    pub registry: Arc<SessionRegistry>,
    /// Fan-out engine.
    pub broadcast: Arc<BroadcastEngine>,
    /// Per-driver re-send timers.
    pub resend: Arc<ResendScheduler>,
    /// Admission controller.
    pub admission: Arc<AdmissionController>,
    /// Availability search.
    pub availability: Arc<AvailabilitySearch>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Connected drivers.
    drivers: Arc<DashMap<DriverId, DriverLink>>,
    /// Engine configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        availability: AvailabilityConfig,
        store: Arc<dyn PositionStore>,
        directory: Arc<dyn FleetDirectory>,
        admission: Arc<AdmissionController>,
        geocoder: Arc<dyn GeocodingProvider>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(EngineMetrics::new());
        let cache = Arc::new(PresenceCache::new());
        let positions = Arc::new(PositionService::new(store, directory, cache));
        let registry = Arc::new(SessionRegistry::new());
        let broadcast_engine = Arc::new(BroadcastEngine::new(
            registry.clone(),
            positions.clone(),
            metrics.clone(),
        ));
        let resend = Arc::new(ResendScheduler::new(
            broadcast_engine.clone(),
            config.clone(),
        ));
        let availability = Arc::new(AvailabilitySearch::new(
            positions.clone(),
            geocoder,
            availability,
        ));

        info!("Real-time engine initialized");

        Self {
            positions,
            registry,
            broadcast: broadcast_engine,
            resend,
            admission,
            availability,
            metrics,
            drivers: Arc::new(DashMap::new()),
            config,
            shutdown_tx,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Admits a driver connection and starts its re-send timer.
    ///
    /// A denial is returned as an error whose kind names the reason; nothing
    /// is registered in that case. Without `frequency_seconds` a running
    /// timer keeps its period.
    pub async fn connect_driver(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        frequency_seconds: Option<u64>,
    ) -> AppResult<ConnectionRecord> {
        // Counted before admission so a concurrent disconnect of an older
        // socket never releases the record this admission refreshes.
        self.drivers
            .entry(driver_id)
            .and_modify(|link| link.connections += 1)
            .or_insert(DriverLink {
                tenant_id,
                connections: 1,
            });

        let record = match self
            .admission
            .authorize_for_tenant(tenant_id, driver_id)
            .await
            .and_then(|admission| admission.into_result())
        {
            Ok(record) => record,
            Err(e) => {
                self.drop_connection(tenant_id, driver_id);
                EngineMetrics::inc(&self.metrics.drivers_denied);
                return Err(e);
            }
        };

        let period = match frequency_seconds {
            Some(_) => self.resend.schedule(tenant_id, driver_id, frequency_seconds),
            None => self.resend.ensure(tenant_id, driver_id),
        };
        EngineMetrics::inc(&self.metrics.drivers_connected);

        info!(
            driver_id = %driver_id,
            tenant_id = %tenant_id,
            resend_period = ?period,
            "Driver connected"
        );
        Ok(record)
    }

    /// Handles a driver disconnect. The connection slot is released once the
    /// driver's last connection closes.
    pub fn disconnect_driver(&self, tenant_id: TenantId, driver_id: DriverId) {
        if self.drop_connection(tenant_id, driver_id) {
            info!(driver_id = %driver_id, tenant_id = %tenant_id, "Driver disconnected");
        } else {
            debug!(driver_id = %driver_id, "Driver still holds another connection");
        }
    }

    /// Removes one connection of the driver. On the last one, releases the
    /// connection record and stops an unwatched timer while the driver's
    /// entry is still locked, so a concurrent connect cannot interleave.
    fn drop_connection(&self, tenant_id: TenantId, driver_id: DriverId) -> bool {
        match self.drivers.entry(driver_id) {
            Entry::Occupied(mut link) => {
                let link_mut = link.get_mut();
                link_mut.connections = link_mut.connections.saturating_sub(1);
                if link_mut.connections > 0 {
                    return false;
                }
                self.admission.release_connection(driver_id, tenant_id);
                if !self.is_watched(tenant_id, driver_id) {
                    self.resend.cancel(driver_id);
                }
                link.remove();
                true
            }
            Entry::Vacant(_) => {
                self.admission.release_connection(driver_id, tenant_id);
                if !self.is_watched(tenant_id, driver_id) {
                    self.resend.cancel(driver_id);
                }
                true
            }
        }
    }

    /// Whether any observer still wants the driver's periodic re-send.
    fn is_watched(&self, tenant_id: TenantId, driver_id: DriverId) -> bool {
        self.broadcast.has_driver_observers(driver_id)
            || self.broadcast.has_tenant_observers(tenant_id)
    }

    /// Processes one raw driver message and returns its acknowledgement.
    ///
    /// Exactly one ack is produced per message: `SUCCESS` once the position
    /// is stored and fanned out, `ERROR` otherwise.
    pub async fn handle_driver_message(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        raw: &str,
    ) -> PositionEnvelope {
        let InboundMessage::PositionUpdate {
            latitude,
            longitude,
        } = match parse_inbound(raw, self.config.max_message_bytes) {
            Ok(message) => message,
            Err(e) => {
                EngineMetrics::inc(&self.metrics.position_failures);
                debug!(driver_id = %driver_id, error = %e, "Rejected driver message");
                return build_ack_error(&e.message);
            }
        };

        self.admission.touch(driver_id, tenant_id);

        match self
            .positions
            .record_position(driver_id, latitude, longitude)
            .await
        {
            Ok(position) => {
                EngineMetrics::inc(&self.metrics.positions_recorded);
                let report = self.broadcast.publish(&position);
                debug!(
                    driver_id = %driver_id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Position published"
                );
                build_ack()
            }
            Err(e) => {
                EngineMetrics::inc(&self.metrics.position_failures);
                if e.kind == ErrorKind::Database {
                    error!(driver_id = %driver_id, error = %e, "Position update failed");
                } else {
                    warn!(driver_id = %driver_id, error = %e, "Position update rejected");
                }
                build_ack_error(&e.message)
            }
        }
    }

    /// Attaches a tenant-wide observer; it first receives the fleet snapshot.
    ///
    /// Every driver in the snapshot gets a re-send timer if it has none.
    pub async fn attach_tenant_observer(
        &self,
        tenant_id: TenantId,
        role: Option<String>,
        sink: Arc<dyn ObserverSink>,
    ) -> AppResult<Arc<ObserverSession>> {
        let session = self
            .broadcast
            .attach_tenant_observer(tenant_id, role, sink)
            .await?;
        for driver_id in session.delivered_drivers() {
            self.resend.ensure(tenant_id, driver_id);
        }
        Ok(session)
    }

    /// Attaches a driver-specific observer and makes sure the driver has a
    /// re-send timer (rescheduled when `frequency_seconds` is given).
    pub async fn attach_driver_observer(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        role: Option<String>,
        frequency_seconds: Option<u64>,
        sink: Arc<dyn ObserverSink>,
    ) -> AppResult<Arc<ObserverSession>> {
        let session = self
            .broadcast
            .attach_driver_observer(tenant_id, driver_id, role, sink)
            .await?;
        match frequency_seconds {
            Some(_) => self.resend.schedule(tenant_id, driver_id, frequency_seconds),
            None => self.resend.ensure(tenant_id, driver_id),
        };
        Ok(session)
    }

    /// Detaches an observer. Idempotent.
    ///
    /// A driver's timer stops once the driver is disconnected and nobody
    /// watches it or its tenant.
    pub fn detach(
        &self,
        tenant_id: TenantId,
        driver_id: Option<DriverId>,
        observer_id: ObserverId,
    ) -> bool {
        let removed = self.broadcast.detach(tenant_id, driver_id, observer_id);
        let candidates = match driver_id {
            Some(driver_id) => vec![driver_id],
            None => self.resend.drivers_of(tenant_id),
        };
        for driver_id in candidates {
            if !self.drivers.contains_key(&driver_id) && !self.is_watched(tenant_id, driver_id) {
                self.resend.cancel(driver_id);
            }
        }
        removed
    }

    /// Drivers of a tenant near an address, nearest first.
    pub async fn nearest_available(
        &self,
        tenant_id: TenantId,
        address: &str,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> AppResult<Vec<AvailableDriver>> {
        self.availability
            .nearest_available(tenant_id, address, radius_km, limit)
            .await
    }

    /// Whether the driver holds a live connection.
    pub fn is_driver_online(&self, driver_id: DriverId) -> bool {
        self.drivers.contains_key(&driver_id)
    }

    /// Counters plus live gauges.
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            observers_active: self.registry.session_count() as u64,
            drivers_online: self.drivers.len() as u64,
            resend_timers: self.resend.active_timers() as u64,
            ..self.metrics.snapshot()
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        // Signal all connection tasks to stop
        let _ = self.shutdown_tx.send(());

        self.resend.shutdown();
        let closed = self.broadcast.close_all();

        info!(observers = closed, "Real-time engine shut down");
        Ok(())
    }
}
