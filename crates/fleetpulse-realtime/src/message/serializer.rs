//! JSON serialization for WebSocket messages.

use super::envelope::PositionEnvelope;
use super::types::InboundMessage;

/// Serialize an outbound envelope to JSON
pub fn serialize_envelope(envelope: &PositionEnvelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

/// Deserialize an inbound driver message from JSON
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::builder::{build_ack, build_fleet_snapshot};

    #[test]
    fn test_ack_wire_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&serialize_envelope(&build_ack()).unwrap()).unwrap();
        assert_eq!(json["type"], "POSITION_ACK");
        assert_eq!(json["status"], "SUCCESS");
        assert!(json["timestamp"].is_string());
        assert!(json.get("data").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_no_data_wire_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&serialize_envelope(&build_fleet_snapshot(vec![])).unwrap())
                .unwrap();
        assert_eq!(json["type"], "POSITION_UPDATE");
        assert_eq!(json["status"], "NO_DATA");
    }

    #[test]
    fn test_inbound_position_update() {
        let msg =
            deserialize_inbound(r#"{"type":"POSITION_UPDATE","latitude":48.1,"longitude":2.1}"#)
                .unwrap();
        assert_eq!(
            msg,
            InboundMessage::PositionUpdate {
                latitude: 48.1,
                longitude: 2.1
            }
        );
        assert!(deserialize_inbound(r#"{"type":"PING"}"#).is_err());
    }
}
