//! Real speaker playback via cpal (feature "devices")

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::decode::{adapt_for_playback, PcmAudio};
use super::sink::AudioSink;
use crate::error::{LiveError, Result};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is created once, kept inside the sink, and dropped
/// with it; it is never used from two threads at once.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Output sink over the system's default output device.
///
/// The stream runs continuously and pulls from a sample queue; `play`
/// swaps the queue contents, which gives replace-not-queue semantics for
/// overlapping responses.
pub struct CpalSink {
    sample_rate: u32,
    channels: u16,
    queue: Arc<Mutex<VecDeque<i16>>>,
    playing: Arc<AtomicBool>,
    /// Kept alive for the sink's lifetime; the Mutex only exists to make
    /// the non-Sync stream shareable.
    _stream: Mutex<SendableStream>,
}

impl CpalSink {
    /// Open the default output device and start the (silent) stream.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| LiveError::DeviceUnavailable {
                device: "speaker".to_string(),
            })?;
        let supported = device
            .default_output_config()
            .map_err(|e| LiveError::Device {
                device: "speaker".to_string(),
                message: format!("Failed to query output config: {}", e),
            })?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let playing = Arc::new(AtomicBool::new(false));
        let stream = build_stream(&device, &supported, Arc::clone(&queue), Arc::clone(&playing))?;
        stream.play().map_err(|e| LiveError::Device {
            device: "speaker".to_string(),
            message: format!("Failed to start playback stream: {}", e),
        })?;

        info!("Playback sink ready ({}Hz, {} channels)", sample_rate, channels);
        Ok(Self {
            sample_rate,
            channels,
            queue,
            playing,
            _stream: Mutex::new(SendableStream(stream)),
        })
    }
}

impl AudioSink for CpalSink {
    fn play(&self, audio: PcmAudio) {
        let adapted = adapt_for_playback(audio, self.sample_rate, self.channels);
        let mut queue = self.queue.lock().unwrap();
        // Replace whatever was sounding
        queue.clear();
        queue.extend(adapted.samples);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.queue.lock().unwrap().clear();
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

fn build_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    queue: Arc<Mutex<VecDeque<i16>>>,
    playing: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let stream_config: cpal::StreamConfig = supported.clone().into();
    let err_callback = |err| {
        error!("Playback stream error: {}", err);
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::I16 => device.build_output_stream(
            &stream_config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let mut q = queue.lock().unwrap();
                for slot in data.iter_mut() {
                    *slot = q.pop_front().unwrap_or(0);
                }
                if q.is_empty() {
                    playing.store(false, Ordering::SeqCst);
                }
            },
            err_callback,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut q = queue.lock().unwrap();
                for slot in data.iter_mut() {
                    *slot = q.pop_front().map(|s| s as f32 / i16::MAX as f32).unwrap_or(0.0);
                }
                if q.is_empty() {
                    playing.store(false, Ordering::SeqCst);
                }
            },
            err_callback,
            None,
        ),
        format => {
            return Err(LiveError::Device {
                device: "speaker".to_string(),
                message: format!("Unsupported output sample format: {:?}", format),
            })
        }
    };

    stream.map_err(|e| LiveError::Device {
        device: "speaker".to_string(),
        message: format!("Failed to build output stream: {}", e),
    })
}
