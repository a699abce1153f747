//! Observer backed by a bounded mpsc channel drained by the transport.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use fleetpulse_core::types::ObserverId;

use super::sink::{DeliveryError, ObserverSink};
use crate::message::PositionEnvelope;

/// Observer whose messages land in a bounded channel.
///
/// The sender sits behind a lock so that `close` and `send` are mutually
/// exclusive: once `close` has dropped it, nothing else is queued.
#[derive(Debug)]
pub struct ChannelObserver {
    /// Observer ID
    id: ObserverId,
    /// Sender for outbound messages; `None` once closed
    sender: Mutex<Option<mpsc::Sender<PositionEnvelope>>>,
}

impl ChannelObserver {
    /// Create an observer and the receiver the transport drains.
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<PositionEnvelope>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let observer = Arc::new(Self {
            id: ObserverId::new(),
            sender: Mutex::new(Some(tx)),
        });
        (observer, rx)
    }
}

impl ObserverSink for ChannelObserver {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn send(&self, message: &PositionEnvelope) -> Result<(), DeliveryError> {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = guard.as_ref() else {
            return Err(DeliveryError::Closed(self.id));
        };
        match sender.try_send(message.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryError::BufferFull(self.id)),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *guard = None;
                Err(DeliveryError::Closed(self.id))
            }
        }
    }

    fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|s| !s.is_closed())
    }

    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}
