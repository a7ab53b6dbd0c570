//! The permission collaborator.

use std::collections::{HashMap, HashSet};

use lodestone_protocol::PlayerIdentity;

/// Permission every ordinary player holds to receive broadcasts.
pub const BROADCAST_CHANNEL_USERS: &str = "lodestone.broadcast.user";

/// Permission for administrative broadcasts (operators, staff).
pub const BROADCAST_CHANNEL_ADMINISTRATIVE: &str = "lodestone.broadcast.admin";

/// Answers "does this identity hold this permission?".
///
/// Must be pure and cheap: the server calls it once per connected player
/// for every permission-filtered broadcast.
pub trait PermissionEvaluator {
    fn has_permission(&self, identity: &PlayerIdentity, permission: &str) -> bool;
}

/// A permission table: defaults everyone holds, plus per-identity grants.
///
/// The defaults start as `{ BROADCAST_CHANNEL_USERS }`, so an unconfigured
/// server delivers plain broadcasts to everyone.
#[derive(Debug, Clone)]
pub struct DefaultPermissions {
    defaults: HashSet<String>,
    grants: HashMap<PlayerIdentity, HashSet<String>>,
}

impl DefaultPermissions {
    pub fn new() -> Self {
        Self {
            defaults: HashSet::from([BROADCAST_CHANNEL_USERS.to_string()]),
            grants: HashMap::new(),
        }
    }

    /// A table with no defaults at all.
    pub fn empty() -> Self {
        Self {
            defaults: HashSet::new(),
            grants: HashMap::new(),
        }
    }

    pub fn grant_default(mut self, permission: impl Into<String>) -> Self {
        self.defaults.insert(permission.into());
        self
    }

    pub fn grant(mut self, identity: PlayerIdentity, permission: impl Into<String>) -> Self {
        self.grants
            .entry(identity)
            .or_default()
            .insert(permission.into());
        self
    }
}

impl Default for DefaultPermissions {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionEvaluator for DefaultPermissions {
    fn has_permission(&self, identity: &PlayerIdentity, permission: &str) -> bool {
        self.defaults.contains(permission)
            || self
                .grants
                .get(identity)
                .is_some_and(|granted| granted.contains(permission))
    }
}
