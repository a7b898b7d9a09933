use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// WebSocket endpoint of the assistant backend
    pub ws_url: String,

    /// Fixed delay before every reconnect attempt
    pub reconnect_delay: Duration,

    /// Sample rate for voice capture
    pub sample_rate: u32,

    /// Number of capture channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            ws_url: "ws://localhost:8000/ws/live".to_string(),
            reconnect_delay: Duration::from_secs(2),
            sample_rate: 16000, // 16kHz voice capture
            channels: 1,        // Mono
        }
    }
}
