//! Inbound message validation.

use fleetpulse_core::error::AppError;

use super::serializer::deserialize_inbound;
use super::types::InboundMessage;

/// Checks size and emptiness, then parses an inbound driver message.
pub fn parse_inbound(raw: &str, max_bytes: usize) -> Result<InboundMessage, AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {} bytes",
            max_bytes
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    deserialize_inbound(raw)
        .map_err(|e| AppError::validation(format!("Malformed position message: {e}")))
}
