//! Per-tenant alert throttling within a rolling window.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use fleetpulse_core::types::TenantId;
use fleetpulse_entity::AlertKind;

/// Throttle key
type ThrottleKey = (TenantId, AlertKind);

/// Suppresses repeated alerts of one kind for one tenant.
#[derive(Debug)]
pub struct AlertThrottle {
    /// Rolling window
    window: TimeDelta,
    /// Last time each alert was sent
    last_sent: DashMap<ThrottleKey, DateTime<Utc>>,
}

impl AlertThrottle {
    /// Create a throttle with the given window.
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            last_sent: DashMap::new(),
        }
    }

    /// Whether an alert may be sent now.
    pub fn should_alert(&self, tenant_id: TenantId, kind: AlertKind) -> bool {
        self.should_alert_at(tenant_id, kind, Utc::now())
    }

    /// Whether an alert may be sent at `now`.
    pub fn should_alert_at(&self, tenant_id: TenantId, kind: AlertKind, now: DateTime<Utc>) -> bool {
        match self.last_sent.get(&(tenant_id, kind)) {
            Some(last) => now - *last >= self.window,
            None => true,
        }
    }

    /// Record that an alert was sent now.
    pub fn mark_alerted(&self, tenant_id: TenantId, kind: AlertKind) {
        self.mark_alerted_at(tenant_id, kind, Utc::now());
    }

    /// Record that an alert was sent at `now`.
    pub fn mark_alerted_at(&self, tenant_id: TenantId, kind: AlertKind, now: DateTime<Utc>) {
        self.last_sent.insert((tenant_id, kind), now);
    }

    /// Check and mark in one step.
    ///
    /// Returns `true` for exactly one caller per window, even when several
    /// race on the same key.
    pub fn try_acquire_at(&self, tenant_id: TenantId, kind: AlertKind, now: DateTime<Utc>) -> bool {
        match self.last_sent.entry((tenant_id, kind)) {
            Entry::Occupied(mut entry) => {
                if now - *entry.get() < self.window {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop entries whose window has elapsed. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.last_sent.len();
        self.last_sent.retain(|_, last| now - *last < self.window);
        before.saturating_sub(self.last_sent.len())
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    /// Whether no alert is being throttled.
    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_once_per_window() {
        let throttle = AlertThrottle::new(TimeDelta::hours(24));
        let tenant = TenantId::new();
        let t0 = Utc::now();

        assert!(throttle.should_alert_at(tenant, AlertKind::ConnectionLimit, t0));
        throttle.mark_alerted_at(tenant, AlertKind::ConnectionLimit, t0);

        let t1 = t0 + TimeDelta::hours(1);
        assert!(!throttle.should_alert_at(tenant, AlertKind::ConnectionLimit, t1));
        // Other kinds and other tenants are independent.
        assert!(throttle.should_alert_at(tenant, AlertKind::DriverLimit, t1));
        assert!(throttle.should_alert_at(TenantId::new(), AlertKind::ConnectionLimit, t1));

        let t2 = t0 + TimeDelta::hours(24);
        assert!(throttle.should_alert_at(tenant, AlertKind::ConnectionLimit, t2));
    }

    #[test]
    fn test_try_acquire_marks() {
        let throttle = AlertThrottle::new(TimeDelta::hours(24));
        let tenant = TenantId::new();
        let now = Utc::now();

        assert!(throttle.try_acquire_at(tenant, AlertKind::SubscriptionProblem, now));
        assert!(!throttle.try_acquire_at(tenant, AlertKind::SubscriptionProblem, now));
        assert!(throttle.try_acquire_at(
            tenant,
            AlertKind::SubscriptionProblem,
            now + TimeDelta::hours(25)
        ));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let throttle = Arc::new(AlertThrottle::new(TimeDelta::hours(24)));
        let tenant = TenantId::new();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                std::thread::spawn(move || {
                    throttle.try_acquire_at(tenant, AlertKind::DriverThreshold, now)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_purge_expired() {
        let throttle = AlertThrottle::new(TimeDelta::hours(24));
        let t0 = Utc::now();
        throttle.mark_alerted_at(TenantId::new(), AlertKind::DriverLimit, t0);
        throttle.mark_alerted_at(TenantId::new(), AlertKind::DriverLimit, t0 + TimeDelta::hours(12));

        assert_eq!(throttle.purge_expired(t0 + TimeDelta::hours(25)), 1);
        assert_eq!(throttle.len(), 1);
    }
}
