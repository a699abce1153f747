//! Delivery of quota alerts to tenant operators.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use fleetpulse_core::result::AppResult;
use fleetpulse_entity::QuotaAlert;

/// Sink for operator alerts.
#[async_trait]
pub trait AlertNotifier: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver one alert. Throttling happens before this is called.
    async fn notify(&self, alert: &QuotaAlert) -> AppResult<()>;
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct TracingAlertNotifier;

#[async_trait]
impl AlertNotifier for TracingAlertNotifier {
    async fn notify(&self, alert: &QuotaAlert) -> AppResult<()> {
        warn!(
            tenant_id = %alert.tenant_id,
            kind = %alert.kind,
            driver_count = ?alert.driver_count,
            connection_count = ?alert.connection_count,
            limit = ?alert.limit,
            "Quota alert: {}",
            alert.message
        );
        Ok(())
    }
}

/// Keeps alerts in memory, for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryAlertNotifier {
    alerts: Mutex<Vec<QuotaAlert>>,
}

impl MemoryAlertNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far, oldest first.
    pub fn recent(&self) -> Vec<QuotaAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of alerts received.
    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AlertNotifier for MemoryAlertNotifier {
    async fn notify(&self, alert: &QuotaAlert) -> AppResult<()> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use fleetpulse_core::types::TenantId;
    use fleetpulse_entity::AlertKind;

    use super::*;

    fn alert(kind: AlertKind) -> QuotaAlert {
        QuotaAlert {
            tenant_id: TenantId::new(),
            kind,
            message: "quota reached".to_string(),
            driver_count: Some(6),
            connection_count: None,
            limit: Some(5),
            raised_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notifiers_accept_alerts() {
        let notifiers: Vec<Box<dyn AlertNotifier>> = vec![
            Box::new(TracingAlertNotifier),
            Box::new(MemoryAlertNotifier::new()),
        ];
        for notifier in &notifiers {
            notifier.notify(&alert(AlertKind::DriverLimit)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_memory_notifier_keeps_order() {
        let notifier = MemoryAlertNotifier::new();
        notifier.notify(&alert(AlertKind::DriverLimit)).await.unwrap();
        notifier
            .notify(&alert(AlertKind::ConnectionLimit))
            .await
            .unwrap();

        let kinds: Vec<_> = notifier.recent().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::DriverLimit, AlertKind::ConnectionLimit]);
        assert_eq!(notifier.count(), 2);
    }
}
