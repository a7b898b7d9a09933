use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::stats::SessionSnapshot;
use crate::audio::{MicrophoneBackend, VoiceRecorder};
use crate::error::Result;
use crate::player::{AudioSink, ResponsePlayer};
use crate::video::{CameraBackend, CameraPipeline, CameraState};
use crate::ws::{LiveEvent, OutboundFrame, SocketConnector, WsClient};

/// One live voice/camera conversation with the assistant backend.
///
/// Owns the socket (through [`WsClient`]), both capture pipelines, and the
/// response player. Everything it holds is released by [`shutdown`], so no
/// resource outlives the session.
///
/// [`shutdown`]: LiveSession::shutdown
pub struct LiveSession {
    config: SessionConfig,

    /// The one transport to the backend
    ws: Arc<WsClient>,

    /// Microphone pipeline, exclusively owned
    recorder: Mutex<VoiceRecorder>,

    /// Camera pipeline, exclusively owned
    camera: Mutex<CameraPipeline>,

    /// Renders inbound response audio
    player: Arc<ResponsePlayer>,

    /// Awaiting a backend reply. Set by record-stop and text-submit, cleared
    /// by the connection manager on receipt or error/close.
    busy: Arc<AtomicBool>,

    /// Latest response text
    last_text: Arc<RwLock<Option<String>>>,

    /// Latest transient error (connection drops, backend errors)
    last_error: Arc<RwLock<Option<String>>>,

    /// Per-control error slots
    mic_error: Arc<RwLock<Option<String>>>,
    camera_error: Arc<RwLock<Option<String>>>,

    /// Inbound event stream, consumed once by `start`
    events_rx: Mutex<Option<mpsc::Receiver<LiveEvent>>>,

    /// Handle for the event dispatch task
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,

    started_at: chrono::DateTime<Utc>,
}

impl LiveSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn SocketConnector>,
        microphone: Box<dyn MicrophoneBackend>,
        camera: Box<dyn CameraBackend>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        info!("Creating live session: {}", config.session_id);

        let busy = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::channel(64);
        let ws = Arc::new(WsClient::new(
            config.ws_url.clone(),
            config.reconnect_delay,
            connector,
            Arc::clone(&busy),
            events_tx,
        ));

        Self {
            config,
            ws,
            recorder: Mutex::new(VoiceRecorder::new(microphone)),
            camera: Mutex::new(CameraPipeline::new(camera)),
            player: Arc::new(ResponsePlayer::new(sink)),
            busy,
            last_text: Arc::new(RwLock::new(None)),
            last_error: Arc::new(RwLock::new(None)),
            mic_error: Arc::new(RwLock::new(None)),
            camera_error: Arc::new(RwLock::new(None)),
            events_rx: Mutex::new(Some(events_rx)),
            dispatch_handle: Mutex::new(None),
            started_at: Utc::now(),
        }
    }

    /// Open the connection and start consuming inbound frames.
    pub async fn start(&self) {
        let Some(mut rx) = self.events_rx.lock().await.take() else {
            warn!("Session already started");
            return;
        };
        self.ws.connect().await;

        let player = Arc::clone(&self.player);
        let last_text = Arc::clone(&self.last_text);
        let last_error = Arc::clone(&self.last_error);

        // Inbound frames are handled here one at a time, in delivery order
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    LiveEvent::Connected => {
                        *last_error.write().await = None;
                    }
                    LiveEvent::Disconnected { reason } => {
                        *last_error.write().await = Some(reason);
                    }
                    LiveEvent::Response { text, audio, error } => {
                        if let Some(text) = text {
                            info!("Response: {}", text);
                            *last_text.write().await = Some(text);
                        }
                        if let Some(bytes) = audio {
                            if let Err(e) = player.play_response(bytes) {
                                warn!("Failed to play response audio: {}", e);
                            }
                        }
                        if let Some(message) = error {
                            *last_error.write().await = Some(format!("Error: {}", message));
                        }
                    }
                    LiveEvent::BackendError { message } => {
                        *last_error.write().await = Some(format!("Error: {}", message));
                    }
                }
            }
            info!("Event dispatch task stopped");
        });
        *self.dispatch_handle.lock().await = Some(handle);

        info!("Live session started: {}", self.config.session_id);
    }

    /// Begin a voice recording. No-op while already recording.
    pub async fn record_start(&self) -> Result<()> {
        let mut recorder = self.recorder.lock().await;
        match recorder.start().await {
            Ok(()) => {
                *self.mic_error.write().await = None;
                Ok(())
            }
            Err(e) => {
                warn!("Could not start recording: {}", e);
                if e.is_device_error() {
                    *self.mic_error.write().await = Some(e.to_string());
                } else {
                    *self.last_error.write().await = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Finish the voice recording and transmit the segment. The session is
    /// busy until the backend's reply (or a connection drop) clears it.
    pub async fn record_stop(&self) -> Result<()> {
        let frame = {
            let mut recorder = self.recorder.lock().await;
            recorder.stop().await?
        };
        if let Some(frame) = frame {
            self.ws.send(frame).await;
            self.busy.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Toggle the camera preview on or off.
    pub async fn camera_toggle(&self) -> Result<CameraState> {
        let mut camera = self.camera.lock().await;
        match camera.toggle().await {
            Ok(state) => {
                *self.camera_error.write().await = None;
                Ok(state)
            }
            Err(e) => {
                warn!("Could not toggle camera: {}", e);
                if e.is_device_error() {
                    *self.camera_error.write().await = Some(e.to_string());
                } else {
                    *self.last_error.write().await = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Capture the current preview frame and transmit it as a still image.
    pub async fn send_snapshot(&self) -> Result<()> {
        let jpeg = {
            let camera = self.camera.lock().await;
            camera.capture_frame().await?
        };
        self.ws.send(OutboundFrame::Image { bytes: jpeg }).await;
        Ok(())
    }

    /// Send a free-text message. Empty or whitespace-only input is ignored.
    pub async fn submit_text(&self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.ws.send(OutboundFrame::Text(trimmed.to_string())).await;
        self.busy.store(true, Ordering::SeqCst);
    }

    /// Current session state for UI feedback
    pub async fn stats(&self) -> SessionSnapshot {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionSnapshot {
            connection: self.ws.state().await,
            busy: self.busy.load(Ordering::SeqCst),
            recording: self.recorder.lock().await.is_recording(),
            camera_on: self.camera.lock().await.is_on(),
            playing: self.player.is_playing(),
            last_response_text: self.last_text.read().await.clone(),
            last_error: self.last_error.read().await.clone(),
            mic_error: self.mic_error.read().await.clone(),
            camera_error: self.camera_error.read().await.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Tear down: abort any active recording, release the camera, stop
    /// playback, close the socket (no further reconnects), join tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down live session: {}", self.config.session_id);

        {
            let mut recorder = self.recorder.lock().await;
            recorder.abort().await;
        }
        {
            let mut camera = self.camera.lock().await;
            if camera.is_on() {
                if let Err(e) = camera.toggle().await {
                    warn!("Failed to release camera on shutdown: {}", e);
                }
            }
        }
        self.player.stop();
        self.ws.close().await;

        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Dispatch task panicked: {}", e);
            }
        }
        info!("Live session closed: {}", self.config.session_id);
    }
}
