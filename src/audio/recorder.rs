//! Bounded voice segment recorder
//!
//! Owns the microphone for its session and drives the
//! `idle -> recording -> idle` cycle: start accumulates raw chunks into the
//! recording buffer, stop releases the device and folds the buffer into a
//! single encoded outbound frame.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioChunk, MicrophoneBackend};
use super::wav;
use crate::error::Result;
use crate::ws::OutboundFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

pub struct VoiceRecorder {
    backend: Box<dyn MicrophoneBackend>,
    state: RecorderState,
    /// Ordered chunks accumulated since the last start
    buffer: Arc<Mutex<Vec<AudioChunk>>>,
    drain_handle: Option<JoinHandle<()>>,
}

impl VoiceRecorder {
    pub fn new(backend: Box<dyn MicrophoneBackend>) -> Self {
        Self {
            backend,
            state: RecorderState::Idle,
            buffer: Arc::new(Mutex::new(Vec::new())),
            drain_handle: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Acquire the microphone and start accumulating chunks.
    ///
    /// A no-op while already recording, so repeated start presses cannot
    /// acquire the device twice or open a second buffer.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == RecorderState::Recording {
            debug!("Already recording, ignoring start");
            return Ok(());
        }
        // A backend failure here leaves nothing acquired
        let mut rx = self.backend.start().await?;
        self.state = RecorderState::Recording;
        info!("Recording started ({})", self.backend.name());

        let buffer = Arc::clone(&self.buffer);
        self.drain_handle = Some(tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                buffer.lock().await.push(chunk);
            }
        }));
        Ok(())
    }

    /// Stop capture, release the device, and encode the accumulated segment
    /// into one outbound audio frame. Returns `None` when not recording.
    pub async fn stop(&mut self) -> Result<Option<OutboundFrame>> {
        if self.state != RecorderState::Recording {
            debug!("Not recording, ignoring stop");
            return Ok(None);
        }
        self.release().await;

        let chunks: Vec<AudioChunk> = {
            let mut guard = self.buffer.lock().await;
            std::mem::take(&mut *guard)
        };
        let bytes = wav::encode_chunks(&chunks)?;
        info!(
            "Recorded segment: {} chunks, {} encoded bytes",
            chunks.len(),
            bytes.len()
        );
        Ok(Some(OutboundFrame::Audio {
            bytes,
            encoding: "audio/wav".to_string(),
        }))
    }

    /// Release the device and discard the buffer without producing a frame.
    /// Used on session teardown.
    pub async fn abort(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        self.release().await;
        self.buffer.lock().await.clear();
        info!("Recording aborted, segment discarded");
    }

    async fn release(&mut self) {
        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop microphone: {}", e);
        }
        // The backend closed its channel; the drain task finishes on its own
        if let Some(handle) = self.drain_handle.take() {
            if let Err(e) = handle.await {
                warn!("Capture drain task panicked: {}", e);
            }
        }
        self.state = RecorderState::Idle;
    }
}
