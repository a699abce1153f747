//! Fan-out of position updates and periodic re-send.

pub mod engine;
pub mod resend;

pub use engine::{BroadcastEngine, FanoutReport};
pub use resend::ResendScheduler;
