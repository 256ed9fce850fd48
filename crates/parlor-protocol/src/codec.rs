//! Codec trait and the JSON implementation.
//!
//! The transport carries text frames; a codec turns typed events into frame
//! text and back. Keeping this behind a trait means the wire format can move
//! to a binary encoding without touching the registry or the engines.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between typed messages and text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into frame text.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses frame text back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or mismatched frames.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] producing compact JSON, the format the party clients speak.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
