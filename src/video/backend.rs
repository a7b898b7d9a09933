use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::info;

use crate::audio::DeviceCounters;
use crate::error::{LiveError, Result};

/// One preview frame, JPEG-encoded by the capture backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// JPEG-encoded image bytes
    pub jpeg: Vec<u8>,
}

/// Camera capture backend trait
///
/// Implementations:
/// - JPEG file: a fixed frame (demos, batch tests)
/// - Mock: scripted frames (unit tests)
///
/// Platform camera backends plug in here without the preview pipeline
/// changing.
#[async_trait::async_trait]
pub trait CameraBackend: Send + Sync {
    /// Acquire the device and start delivering preview frames.
    ///
    /// A failure must leave nothing acquired.
    async fn open(&mut self) -> Result<mpsc::Receiver<VideoFrame>>;

    /// Stop all tracks and release the device
    async fn close(&mut self) -> Result<()>;

    /// Check if the device is currently held
    fn is_open(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Camera backend that serves a JPEG file as its only preview frame
pub struct JpegFileCamera {
    path: PathBuf,
    open: bool,
    tx: Option<mpsc::Sender<VideoFrame>>,
}

impl JpegFileCamera {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            open: false,
            tx: None,
        }
    }
}

#[async_trait::async_trait]
impl CameraBackend for JpegFileCamera {
    async fn open(&mut self) -> Result<mpsc::Receiver<VideoFrame>> {
        let jpeg = std::fs::read(&self.path).map_err(|_| LiveError::DeviceUnavailable {
            device: format!("camera file {}", self.path.display()),
        })?;
        info!(
            "Serving {} as camera preview ({} bytes)",
            self.path.display(),
            jpeg.len()
        );
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(VideoFrame { jpeg });
        self.tx = Some(tx);
        self.open = true;
        Ok(rx)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "jpeg-file-camera"
    }
}

/// Mock camera for testing
pub struct MockCamera {
    frames: Vec<VideoFrame>,
    deny_permission: bool,
    unavailable: bool,
    open: bool,
    tx: Option<mpsc::Sender<VideoFrame>>,
    counters: DeviceCounters,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            deny_permission: false,
            unavailable: false,
            open: false,
            tx: None,
            counters: DeviceCounters::default(),
        }
    }

    /// Frames delivered as soon as the preview opens
    pub fn with_frames(mut self, frames: Vec<VideoFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Simulate the user refusing camera access
    pub fn with_permission_denied(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Simulate a machine without a camera
    pub fn with_unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn counters(&self) -> DeviceCounters {
        self.counters.clone()
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CameraBackend for MockCamera {
    async fn open(&mut self) -> Result<mpsc::Receiver<VideoFrame>> {
        if self.deny_permission {
            return Err(LiveError::PermissionDenied {
                device: "camera".to_string(),
            });
        }
        if self.unavailable {
            return Err(LiveError::DeviceUnavailable {
                device: "camera".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in &self.frames {
            let _ = tx.try_send(frame.clone());
        }
        self.tx = Some(tx);
        self.open = true;
        self.counters.record_start();
        Ok(rx)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.open = false;
        self.counters.record_stop();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "mock-camera"
    }
}
