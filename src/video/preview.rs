//! Camera preview pipeline
//!
//! Owns the camera for its session and drives the `off -> on -> off`
//! toggle. While on, a preview task keeps the newest frame in the preview
//! slot; `capture_frame` snapshots that slot.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{CameraBackend, VideoFrame};
use crate::error::{LiveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Off,
    On,
}

pub struct CameraPipeline {
    backend: Box<dyn CameraBackend>,
    state: CameraState,
    /// Preview surface: the newest frame the backend has delivered
    latest: Arc<RwLock<Option<VideoFrame>>>,
    preview_handle: Option<JoinHandle<()>>,
}

impl CameraPipeline {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            state: CameraState::Off,
            latest: Arc::new(RwLock::new(None)),
            preview_handle: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == CameraState::On
    }

    /// Off -> On acquires the device and binds the preview; On -> Off stops
    /// all tracks and detaches the preview. Returns the resulting state.
    pub async fn toggle(&mut self) -> Result<CameraState> {
        match self.state {
            CameraState::Off => {
                // A backend failure here leaves the pipeline off
                let mut rx = self.backend.open().await?;
                self.state = CameraState::On;
                info!("Camera preview started ({})", self.backend.name());

                let latest = Arc::clone(&self.latest);
                self.preview_handle = Some(tokio::spawn(async move {
                    while let Some(frame) = rx.recv().await {
                        *latest.write().await = Some(frame);
                    }
                }));
            }
            CameraState::On => {
                if let Err(e) = self.backend.close().await {
                    warn!("Failed to release camera: {}", e);
                }
                if let Some(handle) = self.preview_handle.take() {
                    if let Err(e) = handle.await {
                        warn!("Preview task panicked: {}", e);
                    }
                }
                *self.latest.write().await = None;
                self.state = CameraState::Off;
                info!("Camera preview stopped");
            }
        }
        Ok(self.state)
    }

    /// Snapshot the current preview frame as JPEG bytes.
    ///
    /// Fails with [`LiveError::NoFrame`] while the camera is off or before
    /// the stream has delivered its first frame.
    pub async fn capture_frame(&self) -> Result<Vec<u8>> {
        if self.state != CameraState::On {
            return Err(LiveError::NoFrame);
        }
        let guard = self.latest.read().await;
        match guard.as_ref() {
            Some(frame) => Ok(frame.jpeg.clone()),
            None => Err(LiveError::NoFrame),
        }
    }
}
