//! Decoding of response audio payloads
//!
//! The backend sends spoken replies in whatever container its TTS produces
//! (MP3 today, but nothing in the protocol pins that down), so decoding
//! goes through symphonia's probe rather than assuming a format.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

use crate::error::{LiveError, Result};

/// Decoded, playable audio (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Decode one transmitted audio payload into interleaved PCM.
pub fn decode_audio(bytes: Vec<u8>) -> Result<PcmAudio> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LiveError::Decode {
            message: format!("Unrecognized audio container: {}", e),
        })?;

    let mut format = probed.format;
    let track = format.default_track().ok_or_else(|| LiveError::Decode {
        message: "No audio track in payload".to_string(),
    })?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(24000);
    let mut channels = 1u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LiveError::Decode {
            message: format!("Unsupported codec: {}", e),
        })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(LiveError::Decode {
                    message: e.to_string(),
                })
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => {
                return Err(LiveError::Decode {
                    message: e.to_string(),
                })
            }
        }
    }

    if samples.is_empty() {
        return Err(LiveError::Decode {
            message: "Empty audio payload".to_string(),
        });
    }
    Ok(PcmAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Adapt decoded audio to a sink's native format.
pub fn adapt_for_playback(audio: PcmAudio, target_rate: u32, target_channels: u16) -> PcmAudio {
    let mut adapted = audio;
    if adapted.channels != target_channels && target_channels == 1 {
        adapted = stereo_to_mono(adapted);
    }
    if adapted.channels == 1 && target_channels == 2 {
        adapted = mono_to_stereo(adapted);
    }
    if adapted.sample_rate != target_rate {
        adapted = PcmAudio {
            samples: resample(&adapted.samples, adapted.sample_rate, target_rate),
            sample_rate: target_rate,
            channels: adapted.channels,
        };
    }
    adapted
}

/// Nearest-neighbor resampling. Good enough for spoken replies.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as f64 * ratio) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

/// Convert stereo to mono by summing channels with clipping.
fn stereo_to_mono(audio: PcmAudio) -> PcmAudio {
    if audio.channels != 2 {
        return audio; // Only stereo -> mono supported
    }
    let mut mono = Vec::with_capacity(audio.samples.len() / 2);
    for pair in audio.samples.chunks_exact(2) {
        let sum = pair[0] as i32 + pair[1] as i32;
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    PcmAudio {
        samples: mono,
        sample_rate: audio.sample_rate,
        channels: 1,
    }
}

/// Duplicate a mono signal onto both channels.
fn mono_to_stereo(audio: PcmAudio) -> PcmAudio {
    let mut stereo = Vec::with_capacity(audio.samples.len() * 2);
    for &sample in &audio.samples {
        stereo.push(sample);
        stereo.push(sample);
    }
    PcmAudio {
        samples: stereo,
        sample_rate: audio.sample_rate,
        channels: 2,
    }
}
