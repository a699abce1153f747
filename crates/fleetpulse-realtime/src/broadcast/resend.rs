//! Per-driver periodic re-send timers.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fleetpulse_core::config::RealtimeConfig;
use fleetpulse_core::types::{DriverId, TenantId};

use super::engine::BroadcastEngine;

/// Handle of one running timer.
#[derive(Debug)]
struct TimerHandle {
    tenant_id: TenantId,
    period: Duration,
    token: CancellationToken,
}

/// One cancellable re-send task per driver.
///
/// Rescheduling a driver cancels its previous task; other drivers are never
/// affected.
pub struct ResendScheduler {
    /// Driver → running timer
    timers: DashMap<DriverId, TimerHandle>,
    /// Engine the ticks re-send through
    engine: Arc<BroadcastEngine>,
    /// Period bounds
    config: RealtimeConfig,
}

impl std::fmt::Debug for ResendScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendScheduler")
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl ResendScheduler {
    /// Create a scheduler with no timers.
    pub fn new(engine: Arc<BroadcastEngine>, config: RealtimeConfig) -> Self {
        Self {
            timers: DashMap::new(),
            engine,
            config,
        }
    }

    /// Starts (or replaces) the driver's timer.
    ///
    /// `frequency_seconds` below the configured minimum is raised to it;
    /// `None` uses the default period. Returns the effective period.
    pub fn schedule(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        frequency_seconds: Option<u64>,
    ) -> Duration {
        let period = match frequency_seconds {
            Some(seconds) => self.config.clamp_resend_period(seconds),
            None => self.config.default_resend_period(),
        };

        let token = CancellationToken::new();
        let handle = TimerHandle {
            tenant_id,
            period,
            token: token.clone(),
        };
        if let Some(previous) = self.timers.insert(driver_id, handle) {
            previous.token.cancel();
            debug!(driver_id = %driver_id, old = ?previous.period, new = ?period, "Re-send timer replaced");
        }

        let engine = Arc::clone(&self.engine);
        let first_tick = Instant::now() + period;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        engine.resend(tenant_id, driver_id).await;
                    }
                }
            }
        });

        debug!(driver_id = %driver_id, period = ?period, "Re-send timer scheduled");
        period
    }

    /// Starts a default timer unless the driver already has one.
    pub fn ensure(&self, tenant_id: TenantId, driver_id: DriverId) -> Duration {
        if let Some(existing) = self.timers.get(&driver_id) {
            if existing.tenant_id == tenant_id {
                return existing.period;
            }
        }
        self.schedule(tenant_id, driver_id, None)
    }

    /// Stops the driver's timer. Returns whether one was running.
    pub fn cancel(&self, driver_id: DriverId) -> bool {
        match self.timers.remove(&driver_id) {
            Some((_, handle)) => {
                handle.token.cancel();
                debug!(driver_id = %driver_id, "Re-send timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Current period of the driver's timer.
    pub fn period(&self, driver_id: DriverId) -> Option<Duration> {
        self.timers.get(&driver_id).map(|h| h.period)
    }

    /// Drivers of a tenant with a running timer.
    pub fn drivers_of(&self, tenant_id: TenantId) -> Vec<DriverId> {
        self.timers
            .iter()
            .filter(|e| e.value().tenant_id == tenant_id)
            .map(|e| *e.key())
            .collect()
    }

    /// Number of running timers.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Stops every timer.
    pub fn shutdown(&self) {
        let drivers: Vec<DriverId> = self.timers.iter().map(|e| *e.key()).collect();
        let count = drivers.iter().filter(|d| self.cancel(**d)).count();
        info!(count, "Re-send timers stopped");
    }
}
