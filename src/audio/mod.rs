pub mod backend;
pub mod file;
pub mod recorder;
pub mod wav;

#[cfg(feature = "devices")]
pub mod cpal;

pub use backend::{AudioChunk, CaptureConfig, DeviceCounters, MicrophoneBackend, MockMicrophone};
pub use file::WavFileMicrophone;
pub use recorder::{RecorderState, VoiceRecorder};

#[cfg(feature = "devices")]
pub use cpal::CpalMicrophone;
