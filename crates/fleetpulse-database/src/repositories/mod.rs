//! PostgreSQL repository implementations.

pub mod fleet;
pub mod position;

pub use fleet::FleetRepository;
pub use position::PositionRepository;
