//! Live session management
//!
//! This module provides the `LiveSession` abstraction that wires together:
//! - The connection manager (socket + reconnect)
//! - Voice recording and transmission
//! - Camera preview and snapshots
//! - Response playback and the busy flag

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::LiveSession;
pub use stats::SessionSnapshot;
