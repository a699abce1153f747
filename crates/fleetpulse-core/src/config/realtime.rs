//! Presence and broadcast engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Bounded outbound buffer per observer; a full buffer drops the message
    /// for that observer only.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer_size: usize,
    /// Re-send period applied when a driver has no override, in seconds.
    #[serde(default = "default_resend")]
    pub default_resend_seconds: u64,
    /// Lowest accepted re-send period, in seconds. Smaller requests are clamped.
    #[serde(default = "default_min_resend")]
    pub min_resend_seconds: u64,
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message")]
    pub max_message_bytes: usize,
}

impl RealtimeConfig {
    /// Default re-send period.
    pub fn default_resend_period(&self) -> Duration {
        Duration::from_secs(self.default_resend_seconds)
    }

    /// Clamps a requested re-send period to the configured minimum.
    pub fn clamp_resend_period(&self, seconds: u64) -> Duration {
        Duration::from_secs(seconds.max(self.min_resend_seconds))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            observer_buffer_size: default_observer_buffer(),
            default_resend_seconds: default_resend(),
            min_resend_seconds: default_min_resend(),
            max_message_bytes: default_max_message(),
        }
    }
}

fn default_observer_buffer() -> usize {
    256
}

fn default_resend() -> u64 {
    10
}

fn default_min_resend() -> u64 {
    5
}

fn default_max_message() -> usize {
    4096
}
