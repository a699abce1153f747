//! Retry wrapper around a geocoding provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use fleetpulse_core::config::GeocodingConfig;
use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_entity::Coordinates;

use crate::provider::GeocodingProvider;

/// Retries transient failures with a per-attempt timeout and exponential
/// backoff.
///
/// `NotFound` and `Validation` answers are returned as-is on the first
/// attempt. Any other failure is retried; once attempts are exhausted the
/// caller receives `GeocodingUnavailable`.
pub struct RetryingGeocoder {
    inner: Arc<dyn GeocodingProvider>,
    max_attempts: u32,
    timeout: Duration,
    backoff_base: Duration,
}

impl std::fmt::Debug for RetryingGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGeocoder")
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}

impl RetryingGeocoder {
    /// Wrap `inner` with the retry policy from configuration.
    pub fn new(inner: Arc<dyn GeocodingProvider>, config: &GeocodingConfig) -> Self {
        Self {
            inner,
            max_attempts: config.max_attempts.max(1),
            timeout: config.timeout(),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << (attempt - 1).min(16))
    }
}

#[async_trait]
impl GeocodingProvider for RetryingGeocoder {
    async fn resolve_address(&self, address: &str) -> AppResult<Coordinates> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, self.inner.resolve_address(address)).await {
                Ok(Ok(coordinates)) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Geocoding succeeded after retry");
                    }
                    return Ok(coordinates);
                }
                Ok(Err(e)) if matches!(e.kind, ErrorKind::NotFound | ErrorKind::Validation) => {
                    return Err(e);
                }
                Ok(Err(e)) => {
                    tracing::debug!(attempt, error = %e, "Geocoding attempt failed");
                    last_error = e.message;
                }
                Err(_) => {
                    tracing::debug!(attempt, timeout_ms = self.timeout.as_millis() as u64, "Geocoding attempt timed out");
                    last_error = "timeout".to_string();
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        tracing::warn!(
            attempts = self.max_attempts,
            error = %last_error,
            "Geocoding service unavailable"
        );
        Err(AppError::geocoding_unavailable(format!(
            "Geocoding failed after {} attempts: {}",
            self.max_attempts, last_error
        )))
    }

    fn distance_km(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        self.inner.distance_km(lat1, lon1, lat2, lon2)
    }
}
