//! Shared vocabulary for Lodestone.
//!
//! - **Identity** ([`PlayerIdentity`], [`PersistentId`]): who a player is,
//!   independent of whether they're connected right now.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted access lists
//!   are turned into bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every other crate in the workspace depends on this one; it depends on
//! nothing internal.

mod codec;
mod error;
mod identity;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use identity::{PersistentId, PlayerIdentity, normalize_name};
