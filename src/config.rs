use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub audio: AudioSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Live session WebSocket endpoint
    pub ws_url: String,

    /// Base URL for the HTTP chat fallback
    pub http_url: String,

    /// Fixed reconnect delay in milliseconds
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session configuration derived from this deployment configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ws_url: self.backend.ws_url.clone(),
            reconnect_delay: Duration::from_millis(self.backend.reconnect_delay_ms),
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            ..SessionConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "stylist-live".to_string(),
            },
            backend: BackendConfig {
                ws_url: "ws://localhost:8000/ws/live".to_string(),
                http_url: "http://localhost:8000".to_string(),
                reconnect_delay_ms: 2000,
            },
            audio: AudioSettings {
                sample_rate: 16000,
                channels: 1,
            },
        }
    }
}
