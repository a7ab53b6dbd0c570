//! Codecs for the persisted access lists.
//!
//! Ban lists, the whitelist and the operator list are written to disk by the
//! persistence collaborator. The collaborator doesn't care which format it
//! writes, only that something implements [`Codec`]. [`JsonCodec`] is the
//! default: the files stay human-editable, which server admins expect.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec is held by stores that are
/// shared with background load/save tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] on malformed or mismatched input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`, pretty-printed on encode.
///
/// ```rust
/// use lodestone_protocol::{Codec, JsonCodec, PlayerIdentity};
///
/// let codec = JsonCodec;
/// let bans = vec![PlayerIdentity::new("eve")];
///
/// let bytes = codec.encode(&bans).unwrap();
/// let decoded: Vec<PlayerIdentity> = codec.decode(&bytes).unwrap();
/// assert_eq!(bans, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec_pretty(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
