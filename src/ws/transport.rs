//! Socket transport abstraction
//!
//! The connection manager talks to the backend through these traits so that
//! tests can drive the full connection lifecycle without a real server.
//! Production uses [`WsConnector`] (tokio-tungstenite). A connection is
//! handed out as a sender/receiver pair so the two directions can be driven
//! independently.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{LiveError, Result};

/// Outbound half of an established connection
#[async_trait]
pub trait SocketSender: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Close the connection
    async fn close(&mut self);
}

/// Inbound half of an established connection
#[async_trait]
pub trait SocketReceiver: Send {
    /// Receive the next text frame. `None` means the peer closed.
    async fn next(&mut self) -> Option<Result<String>>;
}

/// Opens connections to the backend endpoint
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &str)
        -> Result<(Box<dyn SocketSender>, Box<dyn SocketReceiver>)>;
}

/// WebSocket connector backed by tokio-tungstenite
pub struct WsConnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSender>, Box<dyn SocketReceiver>)> {
        let (stream, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| LiveError::Connection {
                    message: e.to_string(),
                })?;
        let (sink, stream) = stream.split();
        Ok((Box::new(WsSender { sink }), Box::new(WsReceiver { stream })))
    }
}

struct WsSender {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl SocketSender for WsSender {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::text(text))
            .await
            .map_err(|e| LiveError::Connection {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

struct WsReceiver {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl SocketReceiver for WsReceiver {
    async fn next(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await {
                None => return None,
                Some(Err(e)) => {
                    return Some(Err(LiveError::Connection {
                        message: e.to_string(),
                    }))
                }
                Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_owned())),
                Some(Ok(Message::Close(_))) => return None,
                Some(Ok(Message::Binary(payload))) => {
                    debug!("Ignoring {}-byte binary frame", payload.len());
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Test connector: every accepted connection hands the test a
/// [`MockSocketHandle`] for driving the server side of the conversation.
pub struct MockConnector {
    accepted: mpsc::UnboundedSender<MockSocketHandle>,
    /// Number of initial connection attempts to reject
    fail_attempts: AtomicUsize,
    attempts: AtomicUsize,
}

/// Server side of a mock connection
pub struct MockSocketHandle {
    /// Frames pushed here arrive at the client. Dropping the handle closes
    /// the connection from the server side.
    pub to_client: mpsc::UnboundedSender<String>,
    /// Frames the client sent
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl MockConnector {
    /// Returns the connector plus the stream of accepted connections
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockSocketHandle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                accepted: tx,
                fail_attempts: AtomicUsize::new(0),
                attempts: AtomicUsize::new(0),
            },
            rx,
        )
    }

    /// Reject the first `n` connection attempts
    pub fn fail_first(self, n: usize) -> Self {
        self.fail_attempts.store(n, Ordering::SeqCst);
        self
    }

    /// Total connection attempts observed
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(
        &self,
        _url: &str,
    ) -> Result<(Box<dyn SocketSender>, Box<dyn SocketReceiver>)> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_attempts.load(Ordering::SeqCst) {
            return Err(LiveError::Connection {
                message: "mock connection refused".to_string(),
            });
        }
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        // The test may have gone away; the connection itself still works.
        let _ = self.accepted.send(MockSocketHandle {
            to_client,
            from_client,
        });
        Ok((
            Box::new(MockSender {
                outgoing: Some(outgoing),
            }),
            Box::new(MockReceiver { incoming }),
        ))
    }
}

struct MockSender {
    outgoing: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl SocketSender for MockSender {
    async fn send(&mut self, text: String) -> Result<()> {
        match &self.outgoing {
            Some(tx) => tx.send(text).map_err(|_| LiveError::Connection {
                message: "mock connection closed".to_string(),
            }),
            None => Err(LiveError::Connection {
                message: "mock connection closed".to_string(),
            }),
        }
    }

    async fn close(&mut self) {
        self.outgoing = None;
    }
}

struct MockReceiver {
    incoming: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl SocketReceiver for MockReceiver {
    async fn next(&mut self) -> Option<Result<String>> {
        self.incoming.recv().await.map(Ok)
    }
}
