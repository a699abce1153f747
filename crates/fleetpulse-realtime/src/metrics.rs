//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Positions accepted by the store
    pub positions_recorded: AtomicU64,
    /// Position messages that failed (parse, validation, or store)
    pub position_failures: AtomicU64,
    /// Messages queued to observers
    pub messages_sent: AtomicU64,
    /// Per-observer delivery failures
    pub delivery_failures: AtomicU64,
    /// Positions skipped because the observer already had a newer one
    pub stale_skipped: AtomicU64,
    /// Re-send ticks that reached at least one observer
    pub resends: AtomicU64,
    /// Observers ever attached
    pub observers_attached: AtomicU64,
    /// Driver connections ever admitted
    pub drivers_connected: AtomicU64,
    /// Driver connections refused by admission
    pub drivers_denied: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            positions_recorded: self.positions_recorded.load(Ordering::Relaxed),
            position_failures: self.position_failures.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            stale_skipped: self.stale_skipped.load(Ordering::Relaxed),
            resends: self.resends.load(Ordering::Relaxed),
            observers_attached: self.observers_attached.load(Ordering::Relaxed),
            drivers_connected: self.drivers_connected.load(Ordering::Relaxed),
            drivers_denied: self.drivers_denied.load(Ordering::Relaxed),
            observers_active: 0,
            drivers_online: 0,
            resend_timers: 0,
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Positions accepted by the store
    pub positions_recorded: u64,
    /// Failed position messages
    pub position_failures: u64,
    /// Messages queued to observers
    pub messages_sent: u64,
    /// Per-observer delivery failures
    pub delivery_failures: u64,
    /// Out-of-order positions suppressed
    pub stale_skipped: u64,
    /// Re-send ticks delivered
    pub resends: u64,
    /// Observers ever attached
    pub observers_attached: u64,
    /// Driver connections ever admitted
    pub drivers_connected: u64,
    /// Driver connections refused
    pub drivers_denied: u64,
    /// Currently attached observers
    pub observers_active: u64,
    /// Currently connected drivers
    pub drivers_online: u64,
    /// Running re-send timers
    pub resend_timers: u64,
}
