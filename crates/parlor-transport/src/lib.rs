//! Transport abstraction layer for Parlor.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! how party clients are actually reached. Two implementations ship here:
//!
//! - [`WebSocketTransport`] / [`WebSocketConnection`] (feature `websocket`,
//!   default) — the production transport, JSON text frames over
//!   `tokio-tungstenite`.
//! - [`MemoryConnection`] — an in-process loopback used by tests and bots;
//!   it records outbound frames and can simulate a dead socket.

#![allow(async_fn_in_trait)]

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::MemoryConnection;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive text frames.
///
/// Sends take `&self` so a connection can be shared (`Arc`) between the
/// registry and the per-connection read loop.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    fn send_text(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next text frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(&self) -> impl std::future::Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
