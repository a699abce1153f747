//! Presence cache: driver → last known position.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use fleetpulse_core::types::DriverId;
use fleetpulse_entity::Position;

/// Cached position of one driver.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    /// Last known position
    pub position: Position,
    /// When the cache last accepted a position for this driver
    pub last_seen_at: DateTime<Utc>,
}

/// Derived, non-authoritative view of each driver's latest position.
///
/// Writes are monotonic per driver: a position captured before the cached
/// one is ignored, so readers only ever move forward in time.
#[derive(Debug, Default)]
pub struct PresenceCache {
    /// Driver ID → entry
    entries: DashMap<DriverId, PresenceEntry>,
}

impl PresenceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known position of a driver
    pub fn get(&self, driver_id: DriverId) -> Option<Position> {
        self.entries.get(&driver_id).map(|e| e.position.clone())
    }

    /// Full entry of a driver
    pub fn entry(&self, driver_id: DriverId) -> Option<PresenceEntry> {
        self.entries.get(&driver_id).map(|e| e.value().clone())
    }

    /// Stores `position` unless a newer one is cached. Returns whether it
    /// was stored.
    pub fn put(&self, position: Position) -> bool {
        let now = Utc::now();
        match self.entries.entry(position.driver_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().position.captured_at > position.captured_at {
                    return false;
                }
                entry.insert(PresenceEntry {
                    position,
                    last_seen_at: now,
                });
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(PresenceEntry {
                    position,
                    last_seen_at: now,
                });
                true
            }
        }
    }

    /// Forget a driver
    pub fn remove(&self, driver_id: DriverId) -> Option<Position> {
        self.entries.remove(&driver_id).map(|(_, e)| e.position)
    }

    /// Number of cached drivers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
