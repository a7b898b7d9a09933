//! Connection manager for the live assistant socket
//!
//! Owns the one socket a session talks through. Opens it, watches for
//! errors/closure, and re-establishes it after a fixed delay so the rest of
//! the client never has to care about transient drops. A single long-lived
//! loop task performs dialing, serving, and the reconnect wait, which
//! guarantees at most one pending reconnect attempt at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{decode_audio_payload, InboundMessage, OutboundFrame, OutboundMessage};
use super::transport::{SocketConnector, SocketReceiver, SocketSender};

/// Connection lifecycle as observed by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// Deliberately torn down; no reconnect will follow
    Closed,
}

/// Events the connection manager emits toward the session
#[derive(Debug)]
pub enum LiveEvent {
    Connected,
    Disconnected { reason: String },
    Response {
        text: Option<String>,
        audio: Option<Vec<u8>>,
        error: Option<String>,
    },
    BackendError { message: String },
}

pub struct WsClient {
    shared: Arc<Shared>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    url: String,
    reconnect_delay: Duration,
    connector: Arc<dyn SocketConnector>,
    state: RwLock<ConnectionState>,
    connected: AtomicBool,
    loop_running: AtomicBool,
    shutting_down: AtomicBool,
    shutdown: Notify,
    /// Awaiting a backend reply; shared with the session
    busy: Arc<AtomicBool>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    events: Mutex<Option<mpsc::Sender<LiveEvent>>>,
}

impl WsClient {
    pub fn new(
        url: String,
        reconnect_delay: Duration,
        connector: Arc<dyn SocketConnector>,
        busy: Arc<AtomicBool>,
        events: mpsc::Sender<LiveEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                url,
                reconnect_delay,
                connector,
                state: RwLock::new(ConnectionState::Disconnected),
                connected: AtomicBool::new(false),
                loop_running: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                shutdown: Notify::new(),
                busy,
                outbound: Mutex::new(None),
                events: Mutex::new(Some(events)),
            }),
            loop_handle: Mutex::new(None),
        }
    }

    /// Open the connection. Idempotent: a no-op while the connection loop is
    /// already live (open, dialing, or waiting to reconnect), so a manual
    /// reconnect racing the automatic one cannot produce a second socket.
    pub async fn connect(&self) {
        if self.shared.shutting_down.load(Ordering::SeqCst) {
            debug!("Connection closed for good, ignoring connect");
            return;
        }
        if self.shared.loop_running.swap(true, Ordering::SeqCst) {
            debug!("Connection loop already running, skipping redundant connect");
            return;
        }
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { shared.run().await });
        *self.loop_handle.lock().await = Some(handle);
    }

    /// Serialize and transmit one frame. Dropped (logged, not queued) when
    /// no connection is open.
    pub async fn send(&self, frame: OutboundFrame) {
        if !self.shared.connected.load(Ordering::SeqCst) {
            debug!("No open connection, dropping outbound frame");
            return;
        }
        let message = OutboundMessage::from(frame);
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize outbound frame: {}", e);
                return;
            }
        };
        let sender = self.shared.outbound.lock().await.clone();
        match sender {
            Some(tx) => {
                if tx.send(payload).await.is_err() {
                    debug!("Connection went away mid-send, dropping outbound frame");
                }
            }
            None => debug!("No open connection, dropping outbound frame"),
        }
    }

    /// Deliberate teardown: close the socket and stop reconnecting.
    pub async fn close(&self) {
        self.shared.shutting_down.store(true, Ordering::SeqCst);
        self.shared.shutdown.notify_one();
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Connection task panicked: {}", e);
            }
        }
        *self.shared.state.write().await = ConnectionState::Closed;
        // Unblocks any dispatcher waiting on the event channel
        *self.shared.events.lock().await = None;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }
}

impl Shared {
    async fn run(self: Arc<Self>) {
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            // Skip dialing when a connection is somehow still open
            if !self.connected.load(Ordering::SeqCst) {
                *self.state.write().await = ConnectionState::Connecting;
                let attempt = tokio::select! {
                    _ = self.shutdown.notified() => break,
                    attempt = self.connector.connect(&self.url) => attempt,
                };
                match attempt {
                    Ok((sender, receiver)) => self.serve(sender, receiver).await,
                    Err(e) => {
                        warn!("Failed to open connection: {}", e);
                        *self.state.write().await = ConnectionState::Disconnected;
                        self.busy.store(false, Ordering::SeqCst);
                        self.emit(LiveEvent::Disconnected {
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }
            if self.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            // The one and only reconnect timer. Fixed delay, retried
            // indefinitely: no backoff, no attempt cap, no jitter.
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        *self.outbound.lock().await = None;
        self.loop_running.store(false, Ordering::SeqCst);
    }

    /// Pump one established connection until it drops or teardown begins
    async fn serve(&self, mut sender: Box<dyn SocketSender>, mut receiver: Box<dyn SocketReceiver>) {
        info!("Connected to assistant backend at {}", self.url);
        let (tx, mut rx) = mpsc::channel::<String>(64);
        *self.outbound.lock().await = Some(tx);
        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Open;
        // A fresh connection abandons any in-flight expectation of a reply
        self.busy.store(false, Ordering::SeqCst);
        self.emit(LiveEvent::Connected).await;

        let reason = loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                sender.close().await;
                break "closed by client".to_string();
            }
            tokio::select! {
                _ = self.shutdown.notified() => {
                    sender.close().await;
                    break "closed by client".to_string();
                }
                outgoing = rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = sender.send(text).await {
                            warn!("Send failed: {}", e);
                            break e.to_string();
                        }
                    }
                    None => break "outbound channel dropped".to_string(),
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(payload)) => self.dispatch(&payload).await,
                    Some(Err(e)) => {
                        warn!("Connection error: {}", e);
                        break e.to_string();
                    }
                    None => break "connection closed by server".to_string(),
                },
            }
        };

        self.connected.store(false, Ordering::SeqCst);
        *self.outbound.lock().await = None;
        *self.state.write().await = ConnectionState::Disconnected;
        // An open request can no longer be answered on this connection
        self.busy.store(false, Ordering::SeqCst);
        info!("Disconnected from assistant backend: {}", reason);
        self.emit(LiveEvent::Disconnected { reason }).await;
    }

    /// Parse one received payload and route it. Malformed payloads are
    /// logged and skipped, never fatal.
    async fn dispatch(&self, payload: &str) {
        let message = match InboundMessage::parse(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring malformed frame: {}", e);
                return;
            }
        };
        // Any well-formed reply clears the busy flag
        self.busy.store(false, Ordering::SeqCst);
        match message {
            InboundMessage::Response { text, audio, error } => {
                let audio = match audio {
                    Some(data) => match decode_audio_payload(&data) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!("Dropping undecodable audio payload: {}", e);
                            None
                        }
                    },
                    None => None,
                };
                self.emit(LiveEvent::Response { text, audio, error }).await;
            }
            InboundMessage::Error { message } => {
                warn!("Backend reported error: {}", message);
                self.emit(LiveEvent::BackendError { message }).await;
            }
        }
    }

    async fn emit(&self, event: LiveEvent) {
        let sender = self.events.lock().await.clone();
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}
