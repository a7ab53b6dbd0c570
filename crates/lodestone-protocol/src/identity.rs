//! Player identity: who a player is, independent of any connection.
//!
//! An identity outlives sessions. Bans, the whitelist, and the operator list
//! all store identities by value, so they never hold on to a live
//! connection that might go away.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PersistentId
// ---------------------------------------------------------------------------

/// A persistent, globally unique player id (an account UUID).
///
/// Newtype over [`Uuid`] so it can't be confused with other UUID-keyed
/// things. `#[serde(transparent)]` keeps the persisted form a plain UUID
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentId(pub Uuid);

impl PersistentId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the hyphenated (or simple) textual form of a UUID.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// PlayerIdentity
// ---------------------------------------------------------------------------

/// Normalizes a player name for case-insensitive comparison.
///
/// Every name-keyed index in Lodestone goes through this function, so
/// `"Steve"`, `"STEVE"` and `"steve"` all land on the same key.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// A stable reference to a player: a name plus an optional persistent id.
///
/// Identities are immutable once created. Equality follows these rules:
///
/// - both have a persistent id → equal iff the ids match (names may differ,
///   players rename themselves);
/// - neither has one → equal iff the names match case-insensitively;
/// - only one has one → never equal.
///
/// `Hash` is written to agree with that `Eq`, which is what lets an
/// identity be used directly as a `HashSet`/`HashMap` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "IdentityRecord", into = "IdentityRecord")]
pub struct PlayerIdentity {
    name: String,
    /// `name` pre-normalized at construction so comparisons and hashing
    /// never allocate.
    key: String,
    id: Option<PersistentId>,
}

impl PlayerIdentity {
    /// An identity that has never been assigned a persistent id.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = normalize_name(&name);
        Self { name, key, id: None }
    }

    /// An identity backed by a persistent id.
    pub fn with_id(name: impl Into<String>, id: PersistentId) -> Self {
        let mut identity = Self::new(name);
        identity.id = Some(id);
        identity
    }

    /// The display name, exactly as it was given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The case-folded name used for lookups.
    pub fn normalized_name(&self) -> &str {
        &self.key
    }

    /// The persistent id, if this identity has one.
    pub fn id(&self) -> Option<PersistentId> {
        self.id
    }
}

impl PartialEq for PlayerIdentity {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.key == other.key,
            _ => false,
        }
    }
}

impl Eq for PlayerIdentity {}

impl Hash for PlayerIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The discriminant byte keeps id-hashes and name-hashes apart;
        // the two kinds are never equal anyway.
        match self.id {
            Some(id) => {
                0u8.hash(state);
                id.hash(state);
            }
            None => {
                1u8.hash(state);
                self.key.hash(state);
            }
        }
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} ({id})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// The persisted shape of an identity: `{"name": "...", "uuid": "..."}`.
#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<PersistentId>,
}

impl From<IdentityRecord> for PlayerIdentity {
    fn from(record: IdentityRecord) -> Self {
        match record.uuid {
            Some(id) => Self::with_id(record.name, id),
            None => Self::new(record.name),
        }
    }
}

impl From<PlayerIdentity> for IdentityRecord {
    fn from(identity: PlayerIdentity) -> Self {
        Self {
            name: identity.name,
            uuid: identity.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn id(n: u128) -> PersistentId {
        PersistentId(Uuid::from_u128(n))
    }

    #[test]
    fn test_eq_names_without_ids_case_insensitive() {
        assert_eq!(PlayerIdentity::new("Steve"), PlayerIdentity::new("steve"));
        assert_ne!(PlayerIdentity::new("Steve"), PlayerIdentity::new("Stev"));
    }

    #[test]
    fn test_eq_ids_ignore_name() {
        // A renamed account is still the same player.
        let before = PlayerIdentity::with_id("Steve", id(7));
        let after = PlayerIdentity::with_id("Alex", id(7));
        assert_eq!(before, after);
        assert_ne!(before, PlayerIdentity::with_id("Steve", id(8)));
    }

    #[test]
    fn test_eq_mixed_id_and_name_never_equal() {
        let with = PlayerIdentity::with_id("Steve", id(1));
        let without = PlayerIdentity::new("Steve");
        assert_ne!(with, without);
    }

    #[test]
    fn test_hash_agrees_with_eq_in_hash_set() {
        let mut set = HashSet::new();
        set.insert(PlayerIdentity::new("Eve"));
        assert!(set.contains(&PlayerIdentity::new("EVE")));
        assert!(!set.insert(PlayerIdentity::new("eve")));
    }

    #[test]
    fn test_display_includes_id_when_present() {
        assert_eq!(PlayerIdentity::new("Steve").to_string(), "Steve");
        let shown = PlayerIdentity::with_id("Steve", id(1)).to_string();
        assert!(shown.starts_with("Steve ("));
    }

    #[test]
    fn test_serde_omits_missing_uuid() {
        let json = serde_json::to_string(&PlayerIdentity::new("Steve")).unwrap();
        assert_eq!(json, r#"{"name":"Steve"}"#);

        let parsed: PlayerIdentity = serde_json::from_str(
            r#"{"name":"Alex","uuid":"00000000-0000-0000-0000-000000000009"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id(), Some(id(9)));
        assert_eq!(parsed.normalized_name(), "alex");
    }

    #[test]
    fn test_persistent_id_parse_rejects_garbage() {
        assert!(PersistentId::parse("not-a-uuid").is_none());
        assert_eq!(
            PersistentId::parse("00000000-0000-0000-0000-000000000003"),
            Some(id(3))
        );
    }
}
