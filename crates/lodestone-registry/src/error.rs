//! Error types for the registry layer.

use lodestone_protocol::PlayerIdentity;

/// Errors that can occur while mutating the player registry.
///
/// Lookups never produce these: a lookup miss is `None`. Only operations
/// that would break the one-session-per-identity invariant, or that target
/// a player who isn't there, fail.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The identity already has a live session. The caller has to
    /// disconnect the old session first.
    #[error("player {0} is already connected")]
    AlreadyConnected(PlayerIdentity),

    /// A *different* identity already holds this name. Names are unique
    /// among connected players so name lookups stay unambiguous.
    #[error("name of {requested} is already held by connected player {existing}")]
    DuplicateIdentity {
        requested: PlayerIdentity,
        existing: PlayerIdentity,
    },

    /// No connected player matches the identity.
    #[error("player {0} is not connected")]
    NotFound(PlayerIdentity),
}
