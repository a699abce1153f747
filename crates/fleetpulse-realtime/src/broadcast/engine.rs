//! Broadcast engine: attaches observers and fans position updates out to them.

use std::sync::Arc;

use tracing::{debug, info, warn};

use fleetpulse_core::error::AppError;
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, ObserverId, TenantId};
use fleetpulse_entity::Position;

use crate::message::builder::{build_last_known, build_no_data};
use crate::metrics::EngineMetrics;
use crate::observer::ObserverSink;
use crate::presence::PositionService;
use crate::registry::{ObserverSession, SessionRegistry, WatchTopic};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Observers that received the message.
    pub delivered: usize,
    /// Observers skipped because they already had a newer position.
    pub skipped: usize,
    /// Observers whose send failed.
    pub failed: usize,
}

impl FanoutReport {
    /// Observers targeted.
    pub fn targeted(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Delivers positions to tenant-wide and driver-specific observers.
pub struct BroadcastEngine {
    /// Observer topology
    registry: Arc<SessionRegistry>,
    /// Position reads and cache
    positions: Arc<PositionService>,
    /// Counters
    metrics: Arc<EngineMetrics>,
}

impl std::fmt::Debug for BroadcastEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEngine")
            .field("sessions", &self.registry.session_count())
            .finish()
    }
}

impl BroadcastEngine {
    /// Creates a new broadcast engine.
    pub fn new(
        registry: Arc<SessionRegistry>,
        positions: Arc<PositionService>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            positions,
            metrics,
        }
    }

    /// Registers a tenant-wide observer after sending it the fleet snapshot
    /// (`NO_DATA` when the fleet has no position yet).
    ///
    /// Fails with `NotFound` for an unknown tenant.
    pub async fn attach_tenant_observer(
        &self,
        tenant_id: TenantId,
        role: Option<String>,
        sink: Arc<dyn ObserverSink>,
    ) -> AppResult<Arc<ObserverSession>> {
        self.positions.require_known_tenant(tenant_id).await?;
        let session = Arc::new(ObserverSession::new(tenant_id, None, role, sink));
        let snapshot = self.positions.all_last_known(tenant_id).await?;
        let drivers: Vec<DriverId> = snapshot.iter().map(|p| p.driver_id).collect();

        session.deliver_snapshot(snapshot).map_err(|e| {
            EngineMetrics::inc(&self.metrics.delivery_failures);
            AppError::from(e)
        })?;
        EngineMetrics::inc(&self.metrics.messages_sent);

        self.registry
            .register(WatchTopic::Tenant(tenant_id), session.clone());
        EngineMetrics::inc(&self.metrics.observers_attached);

        // Positions published between the snapshot read and registration.
        for driver_id in drivers {
            if let Some(position) = self.positions.cached(driver_id) {
                self.catch_up(WatchTopic::Tenant(tenant_id), &session, &position);
            }
        }

        info!(
            observer_id = %session.id,
            tenant_id = %tenant_id,
            role = session.role.as_deref().unwrap_or(""),
            "Tenant observer attached"
        );
        Ok(session)
    }

    /// Registers a driver-specific observer after sending it the driver's
    /// last known position, or an explicit `NO_DATA`.
    ///
    /// Fails with `NotFound` when the driver does not belong to the tenant.
    pub async fn attach_driver_observer(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        role: Option<String>,
        sink: Arc<dyn ObserverSink>,
    ) -> AppResult<Arc<ObserverSession>> {
        match self.positions.require_tenant(driver_id).await {
            Ok(owner) if owner == tenant_id => {}
            Ok(_) => {
                return Err(AppError::not_found(format!(
                    "Driver {driver_id} not found in tenant {tenant_id}"
                )));
            }
            Err(e) if e.kind.is_admission_denial() => {
                return Err(AppError::not_found(format!(
                    "Driver {driver_id} not found in tenant {tenant_id}"
                )));
            }
            Err(e) => return Err(e),
        }

        let session = Arc::new(ObserverSession::new(
            tenant_id,
            Some(driver_id),
            role,
            sink,
        ));
        let topic = WatchTopic::Driver(driver_id);
        let last = self.positions.last_known(driver_id).await?;

        let initial = match &last {
            Some(position) => session.deliver(position).map(|_| ()),
            None => session.deliver_envelope(&build_last_known(None)),
        };
        initial.map_err(|e| {
            EngineMetrics::inc(&self.metrics.delivery_failures);
            AppError::from(e)
        })?;
        EngineMetrics::inc(&self.metrics.messages_sent);

        self.registry.register(topic, session.clone());
        EngineMetrics::inc(&self.metrics.observers_attached);

        if let Some(position) = self.positions.cached(driver_id) {
            self.catch_up(topic, &session, &position);
        }

        info!(
            observer_id = %session.id,
            tenant_id = %tenant_id,
            driver_id = %driver_id,
            "Driver observer attached"
        );
        Ok(session)
    }

    /// Removes an observer and closes its sink. Idempotent; returns whether
    /// the observer was registered.
    pub fn detach(
        &self,
        tenant_id: TenantId,
        driver_id: Option<DriverId>,
        observer_id: ObserverId,
    ) -> bool {
        let topic = WatchTopic::for_watch(tenant_id, driver_id);
        match self.registry.unregister(topic, observer_id) {
            Some(session) => {
                session.close();
                info!(observer_id = %observer_id, topic = %topic, "Observer detached");
                true
            }
            None => false,
        }
    }

    /// Update path: refreshes the cache, then sends the driver's current
    /// position to every tenant-wide and driver-specific observer.
    ///
    /// Failures are isolated per observer.
    pub fn publish(&self, position: &Position) -> FanoutReport {
        self.positions.refresh_cache(position);
        let current = self
            .positions
            .cached(position.driver_id)
            .unwrap_or_else(|| position.clone());
        self.fan_out(&current)
    }

    /// Re-sends the driver's current cached position to its observers.
    ///
    /// Does nothing when no observer watches the driver or its tenant.
    /// Driver-specific observers of a driver with no position get `NO_DATA`.
    pub async fn resend(&self, tenant_id: TenantId, driver_id: DriverId) -> FanoutReport {
        let driver_topic = WatchTopic::Driver(driver_id);
        let watched_by_driver = self.registry.has_observers(driver_topic);
        if !watched_by_driver && !self.registry.has_observers(WatchTopic::Tenant(tenant_id)) {
            return FanoutReport::default();
        }

        let current = match self.positions.cached(driver_id) {
            Some(position) => Some(position),
            None if watched_by_driver => match self.positions.last_known(driver_id).await {
                Ok(position) => position,
                Err(e) => {
                    warn!(driver_id = %driver_id, error = %e, "Re-send could not load last position");
                    return FanoutReport::default();
                }
            },
            None => None,
        };

        let report = match current {
            Some(position) => self.fan_out(&position),
            None => {
                let envelope = build_no_data("No position recorded for this driver yet");
                let mut report = FanoutReport::default();
                for session in self.registry.observers(driver_topic) {
                    match session.deliver_envelope(&envelope) {
                        Ok(()) => {
                            EngineMetrics::inc(&self.metrics.messages_sent);
                            report.delivered += 1;
                        }
                        Err(e) => {
                            self.record_failure(driver_topic, &session, &e.into());
                            report.failed += 1;
                        }
                    }
                }
                report
            }
        };

        if report.delivered > 0 {
            EngineMetrics::inc(&self.metrics.resends);
        }
        debug!(
            driver_id = %driver_id,
            delivered = report.delivered,
            failed = report.failed,
            "Periodic re-send"
        );
        report
    }

    /// Whether anyone watches this specific driver.
    pub fn has_driver_observers(&self, driver_id: DriverId) -> bool {
        self.registry.has_observers(WatchTopic::Driver(driver_id))
    }

    /// Whether anyone watches the whole tenant.
    pub fn has_tenant_observers(&self, tenant_id: TenantId) -> bool {
        self.registry.has_observers(WatchTopic::Tenant(tenant_id))
    }

    /// Closes and removes every observer.
    pub fn close_all(&self) -> usize {
        let sessions = self.registry.drain();
        for session in &sessions {
            session.close();
        }
        sessions.len()
    }

    fn fan_out(&self, position: &Position) -> FanoutReport {
        let mut report = FanoutReport::default();
        for topic in [
            WatchTopic::Tenant(position.tenant_id),
            WatchTopic::Driver(position.driver_id),
        ] {
            for session in self.registry.observers(topic) {
                match self.deliver_to(topic, &session, position) {
                    Some(true) => report.delivered += 1,
                    Some(false) => report.skipped += 1,
                    None => report.failed += 1,
                }
            }
        }
        report
    }

    /// `Some(sent)` on success, `None` on failure.
    fn deliver_to(
        &self,
        topic: WatchTopic,
        session: &Arc<ObserverSession>,
        position: &Position,
    ) -> Option<bool> {
        match session.deliver(position) {
            Ok(true) => {
                EngineMetrics::inc(&self.metrics.messages_sent);
                Some(true)
            }
            Ok(false) => {
                EngineMetrics::inc(&self.metrics.stale_skipped);
                Some(false)
            }
            Err(e) => {
                self.record_failure(topic, session, &e.into());
                None
            }
        }
    }

    fn catch_up(&self, topic: WatchTopic, session: &Arc<ObserverSession>, position: &Position) {
        match session.catch_up(position) {
            Ok(true) => EngineMetrics::inc(&self.metrics.messages_sent),
            Ok(false) => {}
            Err(e) => self.record_failure(topic, session, &e.into()),
        }
    }

    fn record_failure(&self, topic: WatchTopic, session: &Arc<ObserverSession>, err: &AppError) {
        EngineMetrics::inc(&self.metrics.delivery_failures);
        warn!(observer_id = %session.id, topic = %topic, error = %err, "Delivery to observer failed");
        if !session.is_open() && self.registry.unregister(topic, session.id).is_some() {
            debug!(observer_id = %session.id, topic = %topic, "Pruned closed observer");
        }
    }
}
