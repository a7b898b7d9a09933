//! WAV file microphone backend (demos, batch tests)

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioChunk, MicrophoneBackend};
use crate::error::{LiveError, Result};

/// Microphone backend that replays a WAV file as if it were spoken live.
///
/// The whole file is delivered in fixed-size chunks as soon as capture
/// starts, which makes recordings reproducible.
pub struct WavFileMicrophone {
    path: PathBuf,
    /// Samples per delivered chunk
    chunk_samples: usize,
    capturing: bool,
    tx: Option<mpsc::Sender<AudioChunk>>,
}

impl WavFileMicrophone {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_samples: 1600, // 100ms at 16kHz mono
            capturing: false,
            tx: None,
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for WavFileMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        let reader =
            hound::WavReader::open(&self.path).map_err(|_| LiveError::DeviceUnavailable {
                device: format!("microphone file {}", self.path.display()),
            })?;
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LiveError::Device {
                device: "microphone".to_string(),
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        info!(
            "Replaying {} as microphone input: {} samples, {}Hz, {} channels",
            self.path.display(),
            samples.len(),
            spec.sample_rate,
            spec.channels
        );

        let chunk_count = samples.len().div_ceil(self.chunk_samples).max(1);
        let (tx, rx) = mpsc::channel(chunk_count);
        for window in samples.chunks(self.chunk_samples) {
            let _ = tx.try_send(AudioChunk {
                samples: window.to_vec(),
                sample_rate: spec.sample_rate,
                channels: spec.channels,
            });
        }
        self.tx = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.tx = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "wav-file-microphone"
    }
}
