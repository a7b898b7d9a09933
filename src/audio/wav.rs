//! WAV encoding of recorded voice segments

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::Result;
use super::backend::AudioChunk;

/// Spec used when a segment contains no audio at all
const FALLBACK_SAMPLE_RATE: u32 = 16000;

/// Concatenate an ordered run of captured chunks into one WAV payload.
///
/// The spec (rate/channels) is taken from the first chunk; an empty segment
/// still yields a valid, zero-sample WAV file.
pub fn encode_chunks(chunks: &[AudioChunk]) -> Result<Vec<u8>> {
    let (sample_rate, channels) = chunks
        .first()
        .map(|c| (c.sample_rate, c.channels))
        .unwrap_or((FALLBACK_SAMPLE_RATE, 1));

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for chunk in chunks {
            for &sample in &chunk.samples {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
