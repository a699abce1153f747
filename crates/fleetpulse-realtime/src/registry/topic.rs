//! What an observer watches.

use std::fmt;

use fleetpulse_core::types::{DriverId, TenantId};

/// Key under which observers are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTopic {
    /// Every driver of a tenant.
    Tenant(TenantId),
    /// One driver.
    Driver(DriverId),
}

impl WatchTopic {
    /// Topic for an observer that watches `driver_id`, or the whole tenant
    /// when no driver is given.
    pub fn for_watch(tenant_id: TenantId, driver_id: Option<DriverId>) -> Self {
        match driver_id {
            Some(driver_id) => Self::Driver(driver_id),
            None => Self::Tenant(tenant_id),
        }
    }
}

impl fmt::Display for WatchTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant(id) => write!(f, "tenant:{id}"),
            Self::Driver(id) => write!(f, "driver:{id}"),
        }
    }
}
