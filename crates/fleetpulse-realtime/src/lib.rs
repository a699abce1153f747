//! # fleetpulse-realtime
//!
//! Real-time driver presence and position broadcast. Provides:
//!
//! - Position service over the authoritative store with a derived presence cache
//! - Observer registry keyed per tenant and per driver
//! - Ordered fan-out of position updates with per-observer failure isolation
//! - Per-driver cancellable re-send timers
//! - Nearest-available-driver search over the presence snapshot

pub mod availability;
pub mod broadcast;
pub mod message;
pub mod metrics;
pub mod observer;
pub mod presence;
pub mod registry;
pub mod server;

pub use availability::{AvailabilitySearch, AvailableDriver};
pub use broadcast::engine::BroadcastEngine;
pub use broadcast::resend::ResendScheduler;
pub use observer::channel::ChannelObserver;
pub use observer::sink::{DeliveryError, ObserverSink};
pub use presence::cache::PresenceCache;
pub use presence::service::PositionService;
pub use registry::SessionRegistry;
pub use server::RealtimeEngine;
