//! Unified error type for the Lodestone server.

use lodestone_access::{DenyReason, ReloadFailure, SaveFailure};
use lodestone_registry::RegistryError;
use lodestone_tick::QueueClosed;

use crate::{CommandExecutionFailure, ConfigError, ServerState, WorldReloadError};

/// Top-level error that wraps every layer's errors.
///
/// Lookup misses are not errors; they come back as `None`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The registry refused the change (already connected, name taken,
    /// not connected).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Admission policy rejected the connection. The reason's text is what
    /// the client should be shown.
    #[error("connection denied: {0}")]
    Denied(DenyReason),

    /// A command handler failed. Already logged and reported to the sender.
    #[error(transparent)]
    CommandExecution(#[from] CommandExecutionFailure),

    /// A backing store couldn't be read. The previous lists are in effect.
    #[error(transparent)]
    Reload(#[from] ReloadFailure),

    #[error(transparent)]
    Save(#[from] SaveFailure),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    WorldReload(#[from] WorldReloadError),

    /// The operation needs a running server.
    #[error("server is {0}, not running")]
    NotRunning(ServerState),

    /// The server has shut down. Terminal.
    #[error("server has stopped")]
    Stopped,
}

impl From<QueueClosed> for ServerError {
    fn from(_: QueueClosed) -> Self {
        Self::Stopped
    }
}

#[cfg(test)]
mod tests {
    use lodestone_protocol::PlayerIdentity;

    use super::*;

    #[test]
    fn test_from_registry_error() {
        let err: ServerError = RegistryError::NotFound(PlayerIdentity::new("Steve")).into();
        assert!(matches!(err, ServerError::Registry(_)));
        assert!(err.to_string().contains("Steve"));
    }

    #[test]
    fn test_denied_shows_client_facing_reason() {
        let err = ServerError::Denied(DenyReason::Banned);
        assert_eq!(
            err.to_string(),
            "connection denied: You are banned from this server."
        );
    }

    #[test]
    fn test_queue_closed_maps_to_stopped() {
        let err: ServerError = QueueClosed.into();
        assert!(matches!(err, ServerError::Stopped));
    }

    #[test]
    fn test_server_error_is_send() {
        fn assert_send<T: Send + 'static>() {}
        assert_send::<ServerError>();
    }
}
