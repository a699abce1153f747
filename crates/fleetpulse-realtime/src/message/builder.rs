//! Builder helpers for outbound envelopes.

use fleetpulse_entity::Position;

use super::envelope::{PositionEnvelope, PositionPayload};
use super::types::{MessageStatus, MessageType};

/// Build a push carrying one driver's position
pub fn build_position_update(position: Position) -> PositionEnvelope {
    PositionEnvelope::new(MessageType::PositionUpdate, MessageStatus::Success)
        .with_data(PositionPayload::Single(position))
}

/// Build a driver observer's initial message
pub fn build_last_known(position: Option<Position>) -> PositionEnvelope {
    match position {
        Some(position) => build_position_update(position),
        None => build_no_data("No position recorded for this driver yet"),
    }
}

/// Build a tenant observer's initial snapshot
pub fn build_fleet_snapshot(positions: Vec<Position>) -> PositionEnvelope {
    if positions.is_empty() {
        return build_no_data("No position recorded for this fleet yet");
    }
    PositionEnvelope::new(MessageType::PositionUpdate, MessageStatus::Success)
        .with_data(PositionPayload::Fleet(positions))
}

/// Build an explicit "nothing known yet" push
pub fn build_no_data(message: &str) -> PositionEnvelope {
    PositionEnvelope::new(MessageType::PositionUpdate, MessageStatus::NoData).with_message(message)
}

/// Build a successful ack
pub fn build_ack() -> PositionEnvelope {
    PositionEnvelope::new(MessageType::PositionAck, MessageStatus::Success)
}

/// Build a failed ack
pub fn build_ack_error(message: &str) -> PositionEnvelope {
    PositionEnvelope::new(MessageType::PositionAck, MessageStatus::Error).with_message(message)
}
