//! Response playback

use std::sync::Arc;

use tracing::debug;

use super::decode;
use super::sink::AudioSink;
use crate::error::Result;

/// Renders inbound response audio through the session's shared sink.
///
/// Arrivals replace the current playback; nothing is queued.
pub struct ResponsePlayer {
    sink: Arc<dyn AudioSink>,
}

impl ResponsePlayer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink }
    }

    /// Decode one transmitted payload and play it.
    pub fn play_response(&self, bytes: Vec<u8>) -> Result<()> {
        let audio = decode::decode_audio(bytes)?;
        debug!(
            "Playing response audio: {:.1}s at {}Hz",
            audio.duration_secs(),
            audio.sample_rate
        );
        self.sink.play(audio);
        Ok(())
    }

    pub fn stop(&self) {
        self.sink.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.sink.is_playing()
    }
}
