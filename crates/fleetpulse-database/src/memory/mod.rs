//! Process-local store implementations for single-node deployments and tests.

pub mod fleet;
pub mod position;

pub use fleet::MemoryFleetDirectory;
pub use position::MemoryPositionStore;
