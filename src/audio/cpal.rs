//! Real microphone capture via cpal (feature "devices")

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::backend::{AudioChunk, CaptureConfig, MicrophoneBackend};
use crate::error::{LiveError, Result};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only created, played, and dropped from the backend
/// that owns it; it never crosses thread boundaries while in use.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone backend over the system's default input device.
///
/// Tries the configured format first (typically i16/16kHz/mono); devices
/// that only expose float formats get a software conversion path. Captured
/// chunks are delivered straight from the audio callback.
pub struct CpalMicrophone {
    config: CaptureConfig,
    stream: Option<SendableStream>,
    capturing: bool,
}

impl CpalMicrophone {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stream: None,
            capturing: false,
        }
    }

    fn build_stream(
        &self,
        device: &cpal::Device,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<cpal::Stream> {
        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        let err_callback = |err| {
            error!("Audio stream error: {}", err);
        };

        // Preferred: i16 at the configured rate
        let chunk_tx = tx.clone();
        if let Ok(stream) = device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = chunk_tx.try_send(AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fallback: f32 with software conversion
        device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    let _ = tx.try_send(AudioChunk {
                        samples,
                        sample_rate,
                        channels,
                    });
                },
                err_callback,
                None,
            )
            .map_err(|e| LiveError::Device {
                device: "microphone".to_string(),
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for CpalMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| LiveError::DeviceUnavailable {
                device: "microphone".to_string(),
            })?;

        let (tx, rx) = mpsc::channel(64);
        let stream = self.build_stream(&device, tx)?;
        stream.play().map_err(|e| LiveError::Device {
            device: "microphone".to_string(),
            message: format!("Failed to start capture: {}", e),
        })?;

        info!(
            "Microphone capture started ({}Hz, {} channels)",
            self.config.sample_rate, self.config.channels
        );
        self.stream = Some(SendableStream(stream));
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the stream releases the device and closes the chunk
        // channel (the callback owned the sender)
        self.stream = None;
        self.capturing = false;
        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}
