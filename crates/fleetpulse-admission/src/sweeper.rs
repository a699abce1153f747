//! Cron job that purges abandoned connection records.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use fleetpulse_core::error::AppError;

use crate::controller::AdmissionController;

/// Periodic sweep of stale connection records and expired alert throttles.
pub struct AdmissionSweeper {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Controller swept on every tick
    controller: Arc<AdmissionController>,
}

impl std::fmt::Debug for AdmissionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionSweeper").finish()
    }
}

impl AdmissionSweeper {
    /// Create a sweeper for the given controller
    pub async fn new(controller: Arc<AdmissionController>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            controller,
        })
    }

    /// Register the sweep job on `cron` (six fields, with seconds)
    pub async fn register(&self, cron: &str) -> Result<(), AppError> {
        let controller = Arc::clone(&self.controller);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let controller = Arc::clone(&controller);
            Box::pin(async move {
                let stats = controller.sweep(Utc::now());
                tracing::debug!(
                    connections = stats.connections,
                    alerts = stats.alerts,
                    "Admission sweep finished"
                );
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid admission sweep schedule '{}': {}", cron, e))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add admission sweep: {}", e)))?;

        tracing::info!(cron = %cron, "Registered: admission sweep");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Admission sweeper started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Admission sweeper shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fleetpulse_core::config::AdmissionConfig;
    use fleetpulse_core::error::ErrorKind;
    use fleetpulse_database::memory::MemoryFleetDirectory;

    use super::*;
    use crate::notifier::TracingAlertNotifier;

    fn controller() -> Arc<AdmissionController> {
        Arc::new(AdmissionController::new(
            Arc::new(MemoryFleetDirectory::new()),
            Arc::new(TracingAlertNotifier),
            AdmissionConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_invalid_cron_is_configuration_error() {
        let sweeper = AdmissionSweeper::new(controller()).await.unwrap();
        let err = sweeper.register("not a schedule").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_register_default_schedule() {
        let sweeper = AdmissionSweeper::new(controller()).await.unwrap();
        sweeper
            .register(&AdmissionConfig::default().sweep_cron)
            .await
            .unwrap();
    }
}
