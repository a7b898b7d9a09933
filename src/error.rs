//! Error types for the live session client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveError {
    // Device errors
    #[error("Permission denied for {device}")]
    PermissionDenied { device: String },

    #[error("Device unavailable: {device}")]
    DeviceUnavailable { device: String },

    #[error("Device failure on {device}: {message}")]
    Device { device: String, message: String },

    // Transport errors
    #[error("Connection failed: {message}")]
    Connection { message: String },

    // Wire protocol errors
    #[error("Malformed frame: {message}")]
    Protocol { message: String },

    // Capture errors
    #[error("No frame available")]
    NoFrame,

    #[error("Audio encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("Audio decoding failed: {message}")]
    Decode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LiveError>;

impl LiveError {
    /// True when the error should be shown next to a device control
    /// (microphone or camera button) rather than the response area.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            LiveError::PermissionDenied { .. }
                | LiveError::DeviceUnavailable { .. }
                | LiveError::Device { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_display() {
        let error = LiveError::PermissionDenied {
            device: "microphone".to_string(),
        };
        assert_eq!(error.to_string(), "Permission denied for microphone");
        assert!(error.is_device_error());
    }

    #[test]
    fn test_connection_error_is_not_device_error() {
        let error = LiveError::Connection {
            message: "refused".to_string(),
        };
        assert!(!error.is_device_error());
    }

    #[test]
    fn test_no_frame_display() {
        assert_eq!(LiveError::NoFrame.to_string(), "No frame available");
    }
}
