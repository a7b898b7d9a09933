use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{LiveError, Result};

/// One unit of data produced by a capture pipeline or the text channel.
///
/// A frame is consumed exactly once by the connection manager, which
/// serializes it to its wire form ([`OutboundMessage`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// One encoded voice segment
    Audio { bytes: Vec<u8>, encoding: String },
    /// Free-text message
    Text(String),
    /// Still camera frame (JPEG)
    Image { bytes: Vec<u8> },
}

/// Wire form of an outbound frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Audio {
        /// Base64-encoded audio bytes
        data: String,
        /// MIME type of the encoded audio (e.g. "audio/wav")
        format: String,
    },
    Text {
        data: String,
        /// Always "text"
        format: String,
    },
    Image {
        /// Base64-encoded image bytes
        data: String,
        /// MIME type of the encoded image (e.g. "image/jpeg")
        format: String,
    },
}

impl From<OutboundFrame> for OutboundMessage {
    fn from(frame: OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Audio { bytes, encoding } => OutboundMessage::Audio {
                data: base64::engine::general_purpose::STANDARD.encode(&bytes),
                format: encoding,
            },
            OutboundFrame::Text(text) => OutboundMessage::Text {
                data: text,
                format: "text".to_string(),
            },
            OutboundFrame::Image { bytes } => OutboundMessage::Image {
                data: base64::engine::general_purpose::STANDARD.encode(&bytes),
                format: "image/jpeg".to_string(),
            },
        }
    }
}

/// Wire form of a frame received from the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Response {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Base64-encoded audio bytes
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error { message: String },
}

impl InboundMessage {
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| LiveError::Protocol {
            message: e.to_string(),
        })
    }
}

/// Decode the base64 audio field of a response frame
pub fn decode_audio_payload(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| LiveError::Protocol {
            message: format!("Invalid base64 audio payload: {}", e),
        })
}
