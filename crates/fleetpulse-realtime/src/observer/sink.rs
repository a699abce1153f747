//! Narrow send capability the registry depends on.

use thiserror::Error;

use fleetpulse_core::error::AppError;
use fleetpulse_core::types::ObserverId;

use crate::message::PositionEnvelope;

/// Why one message did not reach one observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The observer disconnected or was detached.
    #[error("observer {0} is closed")]
    Closed(ObserverId),
    /// The observer's outbound buffer is full.
    #[error("observer {0} send buffer is full")]
    BufferFull(ObserverId),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::delivery_failure(err.to_string())
    }
}

/// A connected watcher, as seen by the broadcast engine.
///
/// `send` never blocks. After `close` returns, every `send` fails with
/// [`DeliveryError::Closed`].
pub trait ObserverSink: Send + Sync + std::fmt::Debug + 'static {
    /// Stable identifier.
    fn id(&self) -> ObserverId;

    /// Queue one message for the observer.
    fn send(&self, message: &PositionEnvelope) -> Result<(), DeliveryError>;

    /// Whether messages can still be queued.
    fn is_open(&self) -> bool;

    /// Stop accepting messages.
    fn close(&self);
}
