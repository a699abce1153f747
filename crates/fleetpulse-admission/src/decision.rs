//! Admission outcomes.

use serde::Serialize;
use thiserror::Error;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::ConnectionRecord;

/// Why a driver connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    /// The driver has no tenant, or connected under another tenant.
    #[error("Driver {driver_id} does not belong to a valid tenant")]
    InvalidTenant {
        /// Driver that attempted to connect.
        driver_id: DriverId,
    },
    /// The tenant has no active subscription.
    #[error("Tenant {tenant_id} has no active subscription")]
    NoActiveSubscription {
        /// Tenant concerned.
        tenant_id: TenantId,
    },
    /// The tenant registered more drivers than its plan allows.
    #[error("Tenant {tenant_id} has {driver_count} drivers for a plan of {max_drivers}")]
    DriverQuotaExceeded {
        /// Tenant concerned.
        tenant_id: TenantId,
        /// Registered drivers.
        driver_count: u64,
        /// Plan limit.
        max_drivers: u64,
    },
    /// Every simultaneous connection slot is taken.
    #[error(
        "Tenant {tenant_id} already uses {open_connections} of {max_connections} simultaneous connections"
    )]
    ConnectionQuotaExceeded {
        /// Tenant concerned.
        tenant_id: TenantId,
        /// Open connections, excluding the requesting driver.
        open_connections: u64,
        /// Plan limit.
        max_connections: u64,
    },
}

impl Denial {
    /// Error kind reported to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTenant { .. } => ErrorKind::InvalidTenant,
            Self::NoActiveSubscription { .. } => ErrorKind::NoActiveSubscription,
            Self::DriverQuotaExceeded { .. } => ErrorKind::DriverQuotaExceeded,
            Self::ConnectionQuotaExceeded { .. } => ErrorKind::ConnectionQuotaExceeded,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::new(denial.kind(), denial.to_string())
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Connection accepted; the record now counts against the quota.
    Granted(ConnectionRecord),
    /// Connection refused.
    Denied(Denial),
}

impl Admission {
    /// Whether the connection was accepted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Converts a denial into a typed [`AppError`].
    pub fn into_result(self) -> Result<ConnectionRecord, AppError> {
        match self {
            Self::Granted(record) => Ok(record),
            Self::Denied(denial) => Err(denial.into()),
        }
    }
}
