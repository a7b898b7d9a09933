//! Playback output
//!
//! One shared sink per session. `play` always REPLACES whatever is
//! currently sounding; responses are never queued behind each other.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::decode::PcmAudio;

pub trait AudioSink: Send + Sync {
    /// Start playing, replacing any current playback
    fn play(&self, audio: PcmAudio);

    /// Stop playback immediately
    fn stop(&self);

    /// Whether something is currently sounding
    fn is_playing(&self) -> bool;
}

/// Sink that discards audio. Used in headless builds.
#[derive(Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, audio: PcmAudio) {
        debug!(
            "Discarding {:.1}s of response audio (no playback device)",
            audio.duration_secs()
        );
    }

    fn stop(&self) {}

    fn is_playing(&self) -> bool {
        false
    }
}

/// Mock sink for testing: counts invocations and keeps only the latest
/// audio, mirroring the replace-not-queue contract.
#[derive(Clone, Default)]
pub struct MockSink {
    inner: Arc<MockSinkInner>,
}

#[derive(Default)]
struct MockSinkInner {
    plays: AtomicUsize,
    stops: AtomicUsize,
    playing: AtomicBool,
    last: Mutex<Option<PcmAudio>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of play invocations so far
    pub fn plays(&self) -> usize {
        self.inner.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    /// The most recently played audio, if any
    pub fn last_audio(&self) -> Option<PcmAudio> {
        self.inner.last.lock().unwrap().clone()
    }

    /// Simulate playback running to completion
    pub fn finish(&self) {
        self.inner.playing.store(false, Ordering::SeqCst);
    }
}

impl AudioSink for MockSink {
    fn play(&self, audio: PcmAudio) {
        self.inner.plays.fetch_add(1, Ordering::SeqCst);
        self.inner.playing.store(true, Ordering::SeqCst);
        *self.inner.last.lock().unwrap() = Some(audio);
    }

    fn stop(&self) {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }
}
