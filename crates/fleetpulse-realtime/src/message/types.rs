//! Message kinds, statuses, and inbound driver messages.

use serde::{Deserialize, Serialize};

/// Envelope `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// A position (or fleet snapshot) pushed to an observer.
    PositionUpdate,
    /// Acknowledgement of one inbound driver message.
    PositionAck,
}

/// Envelope `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Payload present, or message processed.
    Success,
    /// No position known yet.
    NoData,
    /// Processing failed.
    Error,
}

/// Messages sent by a driver client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// New GPS fix.
    PositionUpdate {
        /// Latitude in decimal degrees.
        latitude: f64,
        /// Longitude in decimal degrees.
        longitude: f64,
    },
}
