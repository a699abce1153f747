//! Shared test helpers for integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use fleetpulse_admission::{AdmissionController, MemoryAlertNotifier};
use fleetpulse_core::config::AppConfig;
use fleetpulse_core::error::AppError;
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_database::memory::{MemoryFleetDirectory, MemoryPositionStore};
use fleetpulse_entity::{Coordinates, PlanQuota};
use fleetpulse_geo::GeocodingProvider;
use fleetpulse_realtime::RealtimeEngine;
use fleetpulse_realtime::message::PositionEnvelope;

/// Resolves every address to central Paris.
pub struct ParisGeocoder;

#[async_trait]
impl GeocodingProvider for ParisGeocoder {
    async fn resolve_address(&self, address: &str) -> AppResult<Coordinates> {
        if address.is_empty() {
            return Err(AppError::validation("Address must not be empty"));
        }
        Coordinates::new(48.8566, 2.3522)
    }
}

/// Engine wired to in-memory collaborators.
pub struct TestFleet {
    /// Engine under test
    pub engine: RealtimeEngine,
    /// Driver/tenant directory
    pub directory: Arc<MemoryFleetDirectory>,
    /// Authoritative position store
    pub store: Arc<MemoryPositionStore>,
    /// Recorded operator alerts
    pub alerts: Arc<MemoryAlertNotifier>,
}

impl TestFleet {
    /// Create a fleet with default configuration
    pub fn new() -> Self {
        let config = AppConfig::default();
        let directory = Arc::new(MemoryFleetDirectory::new());
        let store = Arc::new(MemoryPositionStore::new());
        let alerts = Arc::new(MemoryAlertNotifier::new());
        let admission = Arc::new(AdmissionController::new(
            directory.clone(),
            alerts.clone(),
            config.admission.clone(),
        ));
        let engine = RealtimeEngine::new(
            config.realtime,
            config.availability,
            store.clone(),
            directory.clone(),
            admission,
            Arc::new(ParisGeocoder),
        );
        Self {
            engine,
            directory,
            store,
            alerts,
        }
    }

    /// A tenant with the given plan and `drivers` registered drivers
    pub fn tenant(&self, quota: PlanQuota, drivers: usize) -> (TenantId, Vec<DriverId>) {
        let tenant = TenantId::new();
        self.directory.set_quota(tenant, quota);
        let ids = (0..drivers)
            .map(|_| self.directory.add_driver(tenant))
            .collect();
        (tenant, ids)
    }

    /// Push a position through the driver channel path
    pub async fn push(
        &self,
        tenant: TenantId,
        driver: DriverId,
        latitude: f64,
        longitude: f64,
    ) -> PositionEnvelope {
        let raw = serde_json::json!({
            "type": "POSITION_UPDATE",
            "latitude": latitude,
            "longitude": longitude,
        })
        .to_string();
        self.engine
            .handle_driver_message(tenant, driver, &raw)
            .await
    }
}

/// Plan with a generous alert threshold
pub fn plan(max_drivers: i32, max_connections: i32) -> PlanQuota {
    PlanQuota {
        max_drivers,
        max_simultaneous_connections: max_connections,
        alert_threshold_percent: 100,
    }
}

/// Everything currently queued for an observer
pub fn drain(rx: &mut mpsc::Receiver<PositionEnvelope>) -> Vec<PositionEnvelope> {
    let mut out = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        out.push(envelope);
    }
    out
}
