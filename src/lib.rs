pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod player;
pub mod session;
pub mod video;
pub mod ws;

pub use audio::{
    AudioChunk, CaptureConfig, DeviceCounters, MicrophoneBackend, MockMicrophone, RecorderState,
    VoiceRecorder, WavFileMicrophone,
};
pub use chat::{ChatClient, ChatReply, CHAT_FALLBACK_REPLY};
pub use config::Config;
pub use error::{LiveError, Result};
pub use player::{AudioSink, MockSink, NullSink, PcmAudio, ResponsePlayer};
pub use session::{LiveSession, SessionConfig, SessionSnapshot};
pub use video::{CameraBackend, CameraPipeline, CameraState, JpegFileCamera, MockCamera, VideoFrame};
pub use ws::{
    ConnectionState, InboundMessage, LiveEvent, MockConnector, MockSocketHandle, OutboundFrame,
    OutboundMessage, SocketConnector, WsClient, WsConnector,
};
