//! Live socket connection to the assistant backend
//!
//! This module provides:
//! - Wire frame types for both directions ([`OutboundMessage`],
//!   [`InboundMessage`])
//! - The connection manager ([`WsClient`]) with automatic reconnection
//! - The transport traits and implementations ([`WsConnector`] for
//!   production, [`MockConnector`] for tests)

pub mod client;
pub mod messages;
pub mod transport;

pub use client::{ConnectionState, LiveEvent, WsClient};
pub use messages::{InboundMessage, OutboundFrame, OutboundMessage};
pub use transport::{
    MockConnector, MockSocketHandle, SocketConnector, SocketReceiver, SocketSender, WsConnector,
};
