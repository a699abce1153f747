//! Last known driver positions.

pub mod cache;
pub mod service;

pub use cache::PresenceCache;
pub use service::PositionService;
