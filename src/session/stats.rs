use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ws::ConnectionState;

/// Point-in-time view of a live session, for UI feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Connection lifecycle state
    pub connection: ConnectionState,

    /// Whether a request has been sent with no reply received yet
    pub busy: bool,

    /// Whether the microphone is currently recording
    pub recording: bool,

    /// Whether the camera preview is on
    pub camera_on: bool,

    /// Whether a response is currently sounding
    pub playing: bool,

    /// Latest response text from the backend
    pub last_response_text: Option<String>,

    /// Latest transient error, rendered near the response area
    pub last_error: Option<String>,

    /// Error to surface next to the microphone control
    pub mic_error: Option<String>,

    /// Error to surface next to the camera control
    pub camera_error: Option<String>,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Session age in seconds
    pub duration_secs: f64,
}
