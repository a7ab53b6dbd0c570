//! Error types for the protocol layer.

/// Errors raised while encoding or decoding persisted data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed document, missing fields, or
    /// wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The document decoded but violates a rule the format imposes, e.g. a
    /// blank player name.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}
