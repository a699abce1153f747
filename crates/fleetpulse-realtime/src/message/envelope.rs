//! Outbound message envelope shared by acks, pushes, and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetpulse_entity::Position;

use super::types::{MessageStatus, MessageType};

/// Payload carried in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionPayload {
    /// One driver's position.
    Single(Position),
    /// A tenant's fleet snapshot.
    Fleet(Vec<Position>),
}

/// Envelope of every message the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEnvelope {
    /// Message kind
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Outcome
    pub status: MessageStatus,
    /// When the message was built
    pub timestamp: DateTime<Utc>,
    /// Position payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PositionPayload>,
    /// Human-readable detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PositionEnvelope {
    /// Create an envelope stamped now
    pub fn new(message_type: MessageType, status: MessageStatus) -> Self {
        Self {
            message_type,
            status,
            timestamp: Utc::now(),
            data: None,
            message: None,
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: PositionPayload) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a detail message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The single position carried, if any
    pub fn position(&self) -> Option<&Position> {
        match &self.data {
            Some(PositionPayload::Single(p)) => Some(p),
            _ => None,
        }
    }

    /// The fleet snapshot carried, if any
    pub fn fleet(&self) -> Option<&[Position]> {
        match &self.data {
            Some(PositionPayload::Fleet(list)) => Some(list),
            _ => None,
        }
    }
}
