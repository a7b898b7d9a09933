pub mod decode;
pub mod player;
pub mod sink;

#[cfg(feature = "devices")]
pub mod cpal;

pub use decode::{adapt_for_playback, decode_audio, PcmAudio};
pub use player::ResponsePlayer;
pub use sink::{AudioSink, MockSink, NullSink};

#[cfg(feature = "devices")]
pub use cpal::CpalSink;
