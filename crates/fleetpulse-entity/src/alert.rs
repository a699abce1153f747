//! Operator alerts raised by the admission controller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetpulse_core::types::TenantId;

/// Kind of quota alert. Wire names match the operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// The tenant has no active subscription.
    #[serde(rename = "probleme_abonnement")]
    SubscriptionProblem,
    /// More drivers registered than the plan allows.
    #[serde(rename = "limite_max_chauffeurs")]
    DriverLimit,
    /// Driver utilisation crossed the plan's alert threshold.
    #[serde(rename = "seuil_alerte_chauffeurs")]
    DriverThreshold,
    /// Simultaneous connection quota exhausted.
    #[serde(rename = "limite_connexions")]
    ConnectionLimit,
}

impl AlertKind {
    /// Wire name of the alert kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionProblem => "probleme_abonnement",
            Self::DriverLimit => "limite_max_chauffeurs",
            Self::DriverThreshold => "seuil_alerte_chauffeurs",
            Self::ConnectionLimit => "limite_connexions",
        }
    }

    /// Whether the alert accompanies a denied connection.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::DriverThreshold)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A throttled notification for tenant operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaAlert {
    /// Tenant concerned.
    pub tenant_id: TenantId,
    /// Alert kind.
    pub kind: AlertKind,
    /// Human-readable summary.
    pub message: String,
    /// Registered drivers at the time of the alert, when known.
    pub driver_count: Option<u64>,
    /// Open connections at the time of the alert, when known.
    pub connection_count: Option<u64>,
    /// Limit that was reached, when applicable.
    pub limit: Option<u64>,
    /// When the alert was raised.
    pub raised_at: DateTime<Utc>,
}
