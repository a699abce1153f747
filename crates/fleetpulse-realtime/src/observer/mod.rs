//! Observer capability and its channel-backed implementation.

pub mod channel;
pub mod sink;

pub use channel::ChannelObserver;
pub use sink::{DeliveryError, ObserverSink};
