//! Error types for the access layer.

use lodestone_protocol::ProtocolError;

use crate::ListKind;

/// The backing store couldn't be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure (permissions, disk full, ...).
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is malformed.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The store is temporarily unreachable (remote stores, tests).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A reload could not read its backing store.
///
/// When this is returned the in-memory list is exactly what it was before
/// the reload started.
#[derive(Debug, thiserror::Error)]
#[error("failed to reload {list}: {source}")]
pub struct ReloadFailure {
    pub list: ListKind,
    #[source]
    pub source: StoreError,
}

/// Writing a list back to its store failed. The in-memory list is
/// unaffected.
#[derive(Debug, thiserror::Error)]
#[error("failed to save {list}: {source}")]
pub struct SaveFailure {
    pub list: ListKind,
    #[source]
    pub source: StoreError,
}
