//! Error types for the transport layer.

use std::io;

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Accepting an incoming connection failed.
    #[error("failed to accept connection: {0}")]
    AcceptFailed(#[source] io::Error),

    /// Sending a frame failed; the peer is likely gone.
    #[error("failed to send frame: {0}")]
    SendFailed(#[source] io::Error),

    /// Receiving a frame failed mid-stream.
    #[error("failed to receive frame: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// The connection is closed and cannot carry further frames.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}
