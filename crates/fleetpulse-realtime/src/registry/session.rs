//! One registered observer and its delivery guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use fleetpulse_core::types::{DriverId, ObserverId, TenantId};
use fleetpulse_entity::Position;

use crate::message::PositionEnvelope;
use crate::message::builder::{build_fleet_snapshot, build_position_update};
use crate::observer::{DeliveryError, ObserverSink};

/// A connected watcher, owned by the [`super::SessionRegistry`].
///
/// All deliveries pass through one guard that remembers the newest position
/// sent per driver, so a single observer never sees a driver move backwards
/// in time even when publish, re-send, and the initial snapshot race.
#[derive(Debug)]
pub struct ObserverSession {
    /// Observer ID (taken from the sink)
    pub id: ObserverId,
    /// Tenant the observer belongs to
    pub tenant_id: TenantId,
    /// Watched driver; `None` for a tenant-wide observer
    pub watched_driver: Option<DriverId>,
    /// Operator classification, advisory only
    pub role: Option<String>,
    /// When the observer attached
    pub opened_at: DateTime<Utc>,
    /// Transport capability
    sink: Arc<dyn ObserverSink>,
    /// Newest position delivered per driver
    delivered: Mutex<HashMap<DriverId, Position>>,
}

impl ObserverSession {
    /// Wrap a sink.
    pub fn new(
        tenant_id: TenantId,
        watched_driver: Option<DriverId>,
        role: Option<String>,
        sink: Arc<dyn ObserverSink>,
    ) -> Self {
        Self {
            id: sink.id(),
            tenant_id,
            watched_driver,
            role,
            opened_at: Utc::now(),
            sink,
            delivered: Mutex::new(HashMap::new()),
        }
    }

    /// Sends one position.
    ///
    /// Returns `Ok(false)` without sending when a newer position of the same
    /// driver was already delivered.
    pub fn deliver(&self, position: &Position) -> Result<bool, DeliveryError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        if delivered
            .get(&position.driver_id)
            .is_some_and(|last| last.captured_at > position.captured_at)
        {
            return Ok(false);
        }
        self.sink.send(&build_position_update(position.clone()))?;
        delivered.insert(position.driver_id, position.clone());
        Ok(true)
    }

    /// Sends `position` only if it is newer than what this observer already
    /// has for the driver. Used right after registration.
    pub fn catch_up(&self, position: &Position) -> Result<bool, DeliveryError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        if delivered
            .get(&position.driver_id)
            .is_some_and(|last| last.captured_at >= position.captured_at)
        {
            return Ok(false);
        }
        self.sink.send(&build_position_update(position.clone()))?;
        delivered.insert(position.driver_id, position.clone());
        Ok(true)
    }

    /// Sends a fleet snapshot (or `NO_DATA` when empty).
    ///
    /// Entries older than what this observer already received are replaced
    /// by the newer delivered position.
    pub fn deliver_snapshot(&self, positions: Vec<Position>) -> Result<(), DeliveryError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot: Vec<Position> = positions
            .into_iter()
            .map(|p| match delivered.get(&p.driver_id) {
                Some(last) if last.captured_at > p.captured_at => last.clone(),
                _ => p,
            })
            .collect();
        self.sink.send(&build_fleet_snapshot(snapshot.clone()))?;
        for p in snapshot {
            delivered.insert(p.driver_id, p);
        }
        Ok(())
    }

    /// Sends a message that carries no position.
    pub fn deliver_envelope(&self, envelope: &PositionEnvelope) -> Result<(), DeliveryError> {
        let _delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        self.sink.send(envelope)
    }

    /// Drivers this observer has received a position for.
    pub fn delivered_drivers(&self) -> Vec<DriverId> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }

    /// Whether the transport still accepts messages.
    pub fn is_open(&self) -> bool {
        self.sink.is_open()
    }

    /// Closes the sink; no message is delivered afterwards.
    pub fn close(&self) {
        self.sink.close();
    }
}
