//! WebSocket message definitions.

pub mod builder;
pub mod envelope;
pub mod serializer;
pub mod types;
pub mod validator;

pub use envelope::{PositionEnvelope, PositionPayload};
pub use types::{InboundMessage, MessageStatus, MessageType};
