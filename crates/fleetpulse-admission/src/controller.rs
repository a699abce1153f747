//! Admission controller: the quota gate in front of every driver connection.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use fleetpulse_core::config::AdmissionConfig;
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_database::FleetDirectory;
use fleetpulse_entity::{AlertKind, QuotaAlert};

use crate::decision::{Admission, Denial};
use crate::notifier::AlertNotifier;
use crate::table::ConnectionTable;
use crate::throttle::AlertThrottle;

/// Counts removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Stale connection records purged.
    pub connections: usize,
    /// Expired throttle entries purged.
    pub alerts: usize,
}

/// Validates subscription quotas before a driver connection is accepted.
pub struct AdmissionController {
    /// Drivers, tenants and subscriptions.
    directory: Arc<dyn FleetDirectory>,
    /// Open connection records.
    table: ConnectionTable,
    /// Alert throttle.
    throttle: AlertThrottle,
    /// Where throttled alerts go.
    notifier: Arc<dyn AlertNotifier>,
    /// Admission configuration.
    config: AdmissionConfig,
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("table", &self.table)
            .field("throttle", &self.throttle)
            .field("config", &self.config)
            .finish()
    }
}

impl AdmissionController {
    /// Create a new controller.
    pub fn new(
        directory: Arc<dyn FleetDirectory>,
        notifier: Arc<dyn AlertNotifier>,
        config: AdmissionConfig,
    ) -> Self {
        let staleness = TimeDelta::minutes(config.staleness_minutes as i64);
        let window = TimeDelta::hours(config.alert_window_hours as i64);
        Self {
            directory,
            table: ConnectionTable::new(staleness),
            throttle: AlertThrottle::new(window),
            notifier,
            config,
        }
    }

    /// Admission decision for a driver connecting under its own tenant.
    ///
    /// Fails with `NotFound` when the driver does not exist; a refusal is an
    /// `Ok(Admission::Denied)`.
    pub async fn authorize_connection(&self, driver_id: DriverId) -> AppResult<Admission> {
        self.authorize_at(None, driver_id, Utc::now()).await
    }

    /// Admission decision for a driver connecting under `tenant_id`.
    ///
    /// A driver of another tenant is denied with `InvalidTenant`.
    pub async fn authorize_for_tenant(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
    ) -> AppResult<Admission> {
        self.authorize_at(Some(tenant_id), driver_id, Utc::now())
            .await
    }

    /// Admission decision evaluated at `now`.
    pub async fn authorize_at(
        &self,
        claimed_tenant: Option<TenantId>,
        driver_id: DriverId,
        now: DateTime<Utc>,
    ) -> AppResult<Admission> {
        let tenant_id = match self.directory.driver_tenant(driver_id).await? {
            Some(tenant_id) if claimed_tenant.is_none_or(|claimed| claimed == tenant_id) => {
                tenant_id
            }
            _ => {
                warn!(driver_id = %driver_id, claimed_tenant = ?claimed_tenant, "Driver connection denied: invalid tenant");
                return Ok(Admission::Denied(Denial::InvalidTenant { driver_id }));
            }
        };

        if !self.config.enabled {
            let record = self.table.open_unchecked(tenant_id, driver_id, now);
            debug!(driver_id = %driver_id, tenant_id = %tenant_id, "Admission disabled, connection accepted");
            return Ok(Admission::Granted(record));
        }

        let Some(quota) = self.directory.active_quota(tenant_id).await? else {
            self.raise_alert(
                QuotaAlert {
                    tenant_id,
                    kind: AlertKind::SubscriptionProblem,
                    message: "No active subscription; driver connections are refused".to_string(),
                    driver_count: None,
                    connection_count: None,
                    limit: None,
                    raised_at: now,
                },
                now,
            )
            .await;
            warn!(driver_id = %driver_id, tenant_id = %tenant_id, "Driver connection denied: no active subscription");
            return Ok(Admission::Denied(Denial::NoActiveSubscription { tenant_id }));
        };

        let driver_count = self.directory.driver_count(tenant_id).await?;
        let max_drivers = quota.max_drivers.max(0) as u64;

        if quota.drivers_exceeded(driver_count) {
            self.raise_alert(
                QuotaAlert {
                    tenant_id,
                    kind: AlertKind::DriverLimit,
                    message: format!(
                        "{driver_count} drivers registered for a plan of {max_drivers}"
                    ),
                    driver_count: Some(driver_count),
                    connection_count: None,
                    limit: Some(max_drivers),
                    raised_at: now,
                },
                now,
            )
            .await;
            warn!(
                driver_id = %driver_id,
                tenant_id = %tenant_id,
                driver_count,
                max_drivers,
                "Driver connection denied: driver quota exceeded"
            );
            return Ok(Admission::Denied(Denial::DriverQuotaExceeded {
                tenant_id,
                driver_count,
                max_drivers,
            }));
        }

        if quota.threshold_reached(driver_count) {
            let percent = quota.utilisation_percent(driver_count);
            self.raise_alert(
                QuotaAlert {
                    tenant_id,
                    kind: AlertKind::DriverThreshold,
                    message: format!(
                        "Driver utilisation at {percent}% ({driver_count} of {max_drivers})"
                    ),
                    driver_count: Some(driver_count),
                    connection_count: None,
                    limit: Some(max_drivers),
                    raised_at: now,
                },
                now,
            )
            .await;
        }

        let max_connections = quota.max_simultaneous_connections.max(0) as u64;
        match self
            .table
            .try_open(tenant_id, driver_id, max_connections, now)
        {
            Ok(record) => {
                info!(driver_id = %driver_id, tenant_id = %tenant_id, "Driver connection admitted");
                Ok(Admission::Granted(record))
            }
            Err(open_connections) => {
                self.raise_alert(
                    QuotaAlert {
                        tenant_id,
                        kind: AlertKind::ConnectionLimit,
                        message: format!(
                            "{open_connections} of {max_connections} simultaneous connections in use"
                        ),
                        driver_count: Some(driver_count),
                        connection_count: Some(open_connections),
                        limit: Some(max_connections),
                        raised_at: now,
                    },
                    now,
                )
                .await;
                warn!(
                    driver_id = %driver_id,
                    tenant_id = %tenant_id,
                    open_connections,
                    max_connections,
                    "Driver connection denied: connection quota exceeded"
                );
                Ok(Admission::Denied(Denial::ConnectionQuotaExceeded {
                    tenant_id,
                    open_connections,
                    max_connections,
                }))
            }
        }
    }

    /// Removes the driver's connection record. Idempotent.
    pub fn release_connection(&self, driver_id: DriverId, tenant_id: TenantId) {
        if self.table.release(tenant_id, driver_id) {
            debug!(driver_id = %driver_id, tenant_id = %tenant_id, "Connection record released");
        }
    }

    /// Refreshes the driver's last activity.
    pub fn touch(&self, driver_id: DriverId, tenant_id: TenantId) {
        self.table.touch(tenant_id, driver_id, Utc::now());
    }

    /// Whether an alert of `kind` may be sent to the tenant now.
    pub fn should_alert(&self, tenant_id: TenantId, kind: AlertKind) -> bool {
        self.throttle.should_alert(tenant_id, kind)
    }

    /// Records that an alert of `kind` was sent to the tenant now.
    pub fn mark_alerted(&self, tenant_id: TenantId, kind: AlertKind) {
        self.throttle.mark_alerted(tenant_id, kind);
    }

    /// Live connections of a tenant.
    pub fn open_connections(&self, tenant_id: TenantId) -> u64 {
        self.table.open_count(tenant_id, Utc::now())
    }

    /// Purges stale connection records and expired throttle entries.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepStats {
        let stats = SweepStats {
            connections: self.table.purge_stale(now),
            alerts: self.throttle.purge_expired(now),
        };
        if stats.connections > 0 || stats.alerts > 0 {
            info!(
                connections = stats.connections,
                alerts = stats.alerts,
                "Admission sweep purged stale entries"
            );
        }
        stats
    }

    /// Connection table, for inspection.
    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    /// Sends the alert unless one of the same kind went out within the window.
    ///
    /// A notifier failure is logged and the throttle stays marked.
    async fn raise_alert(&self, alert: QuotaAlert, now: DateTime<Utc>) {
        if !self.throttle.try_acquire_at(alert.tenant_id, alert.kind, now) {
            debug!(tenant_id = %alert.tenant_id, kind = %alert.kind, "Alert throttled");
            return;
        }
        if let Err(e) = self.notifier.notify(&alert).await {
            warn!(tenant_id = %alert.tenant_id, kind = %alert.kind, error = %e, "Failed to deliver quota alert");
        }
    }
}
