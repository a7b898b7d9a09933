pub mod backend;
pub mod preview;

pub use backend::{CameraBackend, JpegFileCamera, MockCamera, VideoFrame};
pub use preview::{CameraPipeline, CameraState};
