//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A value could not be serialized into frame text.
    #[cfg(feature = "json")]
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame text could not be parsed into the expected type.
    #[cfg(feature = "json")]
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structurally valid frame that the receiver cannot accept.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
