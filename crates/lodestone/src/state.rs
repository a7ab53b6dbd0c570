//! The server lifecycle.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a [`Server`](crate::Server).
///
/// Transitions are strictly ordered, no skipping:
///
/// ```text
/// Starting → Running → ShuttingDown → Stopped
/// ```
///
/// - **Starting**: built but not started. Only bootstrap calls
///   ([`Server::start`](crate::Server::start)) are accepted.
/// - **Running**: every registry and access-list operation is available.
/// - **ShuttingDown**: players are being disconnected and lists saved.
///   New operations are refused.
/// - **Stopped**: terminal. Every operation fails with
///   [`ServerError::Stopped`](crate::ServerError::Stopped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl ServerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// The state after this one, or `None` from `Stopped`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Starting => Some(Self::Running),
            Self::Running => Some(Self::ShuttingDown),
            Self::ShuttingDown => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
