use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{LiveError, Result};

/// Raw captured audio (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Configuration for microphone capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Chunk size in milliseconds (affects latency)
    pub chunk_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz voice capture
            channels: 1,        // Mono
            chunk_duration_ms: 100,
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - cpal: real input device (feature "devices")
/// - WAV file: replay a recording (demos, batch tests)
/// - Mock: scripted chunks (unit tests)
#[async_trait::async_trait]
pub trait MicrophoneBackend: Send + Sync {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that will receive audio chunks until the
    /// backend is stopped. A failure must leave nothing acquired.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Shared acquire/release counters for mock devices, so tests can observe
/// the device lifecycle after handing a backend to its pipeline.
#[derive(Debug, Clone, Default)]
pub struct DeviceCounters {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl DeviceCounters {
    pub fn record_start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Mock microphone for testing
pub struct MockMicrophone {
    chunks: Vec<AudioChunk>,
    deny_permission: bool,
    unavailable: bool,
    capturing: bool,
    tx: Option<mpsc::Sender<AudioChunk>>,
    counters: DeviceCounters,
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            deny_permission: false,
            unavailable: false,
            capturing: false,
            tx: None,
            counters: DeviceCounters::default(),
        }
    }

    /// Chunks delivered as soon as capture starts
    pub fn with_chunks(mut self, chunks: Vec<AudioChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Simulate the user refusing microphone access
    pub fn with_permission_denied(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Simulate a machine without a microphone
    pub fn with_unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn counters(&self) -> DeviceCounters {
        self.counters.clone()
    }
}

impl Default for MockMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for MockMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        if self.deny_permission {
            return Err(LiveError::PermissionDenied {
                device: "microphone".to_string(),
            });
        }
        if self.unavailable {
            return Err(LiveError::DeviceUnavailable {
                device: "microphone".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            let _ = tx.try_send(chunk.clone());
        }
        // Keep the sender so the channel stays open until stop()
        self.tx = Some(tx);
        self.capturing = true;
        self.counters.record_start();
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.tx = None;
        self.capturing = false;
        self.counters.record_stop();
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "mock-microphone"
    }
}
