//! Offline player records: every identity the server has ever referenced.
//!
//! A record exists for anyone who connected at least once, and also for any
//! name somebody merely *asked about* (e.g. `/ban Notch` before Notch ever
//! joined). Such records are materialized lazily on lookup and carry no
//! last-seen time.
//!
//! Ban, whitelist and operator status are not stored here. They are derived
//! from the access lists whenever someone asks.

use std::collections::HashMap;
use std::time::SystemTime;

use lodestone_protocol::{PersistentId, PlayerIdentity, normalize_name};

/// Last-known metadata for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflinePlayerRecord {
    pub identity: PlayerIdentity,
    /// When the record was created (first connect or first lookup).
    pub first_seen: SystemTime,
    /// When the player was last online. `None` for names that were looked
    /// up but never connected.
    pub last_seen: Option<SystemTime>,
}

impl OfflinePlayerRecord {
    fn new(identity: PlayerIdentity) -> Self {
        Self {
            identity,
            first_seen: SystemTime::now(),
            last_seen: None,
        }
    }

    /// Whether this identity has ever held a session.
    pub fn has_played_before(&self) -> bool {
        self.last_seen.is_some()
    }
}

/// In-memory table of [`OfflinePlayerRecord`]s.
#[derive(Debug, Default)]
pub struct OfflineRoster {
    records: HashMap<PlayerIdentity, OfflinePlayerRecord>,
    /// Normalized name → identity that most recently used it.
    by_name: HashMap<String, PlayerIdentity>,
}

impl OfflineRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `name`, creating a placeholder if the name is new.
    ///
    /// Never fails and never blocks. "Every player exists" from the
    /// caller's point of view.
    pub fn get_or_create(&mut self, name: &str) -> &OfflinePlayerRecord {
        let key = normalize_name(name);
        let identity = match self.by_name.get(&key) {
            Some(identity) => identity.clone(),
            None => {
                let identity = PlayerIdentity::new(name);
                tracing::debug!(%identity, "materialized offline record");
                self.by_name.insert(key, identity.clone());
                identity
            }
        };
        self.records
            .entry(identity.clone())
            .or_insert_with(|| OfflinePlayerRecord::new(identity))
    }

    /// The record for a persistent id, if the id has ever been seen.
    pub fn by_id(&self, id: PersistentId) -> Option<&OfflinePlayerRecord> {
        // Identities with ids compare and hash by id alone, so the name of
        // the lookup key doesn't matter.
        self.records.get(&PlayerIdentity::with_id("", id))
    }

    /// The record for an identity, if one exists.
    pub fn get(&self, identity: &PlayerIdentity) -> Option<&OfflinePlayerRecord> {
        self.records.get(identity)
    }

    /// Stamps `identity` as seen now (on connect and on disconnect).
    ///
    /// The name index moves to this identity. A never-played placeholder
    /// for the same name is dropped, since the real account has now shown
    /// up.
    pub fn record_seen(&mut self, identity: &PlayerIdentity) {
        let now = SystemTime::now();
        let key = identity.normalized_name().to_string();

        // A renamed account releases its old name.
        if let Some(existing) = self.records.get(identity) {
            let old_key = existing.identity.normalized_name();
            if old_key != key
                && self
                    .by_name
                    .get(old_key)
                    .is_some_and(|owner| owner == identity)
            {
                self.by_name.remove(old_key);
            }
        }

        if let Some(previous) = self.by_name.insert(key, identity.clone()) {
            let stale_placeholder = previous != *identity
                && self
                    .records
                    .get(&previous)
                    .is_some_and(|r| !r.has_played_before());
            if stale_placeholder {
                self.records.remove(&previous);
            }
        }

        let record = self
            .records
            .entry(identity.clone())
            .or_insert_with(|| OfflinePlayerRecord::new(identity.clone()));
        // Keep the freshest spelling of the name.
        record.identity = identity.clone();
        record.last_seen = Some(now);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id(name: &str, n: u128) -> PlayerIdentity {
        PlayerIdentity::with_id(name, PersistentId(uuid::Uuid::from_u128(n)))
    }

    #[test]
    fn test_get_or_create_materializes_unknown_name() {
        let mut roster = OfflineRoster::new();

        let record = roster.get_or_create("Notch");

        assert_eq!(record.identity.name(), "Notch");
        assert!(!record.has_played_before());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_get_or_create_is_case_insensitive_and_idempotent() {
        let mut roster = OfflineRoster::new();
        roster.get_or_create("Notch");
        roster.get_or_create("NOTCH");

        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_record_seen_replaces_placeholder() {
        let mut roster = OfflineRoster::new();
        roster.get_or_create("Steve");

        roster.record_seen(&with_id("Steve", 1));

        assert_eq!(roster.len(), 1);
        let record = roster.get_or_create("steve");
        assert_eq!(record.identity.id(), Some(PersistentId(uuid::Uuid::from_u128(1))));
        assert!(record.has_played_before());
    }

    #[test]
    fn test_record_seen_keeps_played_record_of_previous_owner() {
        // Name changed hands: the old account keeps its history.
        let mut roster = OfflineRoster::new();
        roster.record_seen(&with_id("Steve", 1));
        roster.record_seen(&with_id("Steve", 2));

        assert_eq!(roster.len(), 2);
        assert!(roster.by_id(PersistentId(uuid::Uuid::from_u128(1))).is_some());
    }

    #[test]
    fn test_by_id_unknown_returns_none() {
        let roster = OfflineRoster::new();
        assert!(roster.by_id(PersistentId::random()).is_none());
    }

    #[test]
    fn test_record_seen_updates_display_name() {
        let mut roster = OfflineRoster::new();
        roster.record_seen(&with_id("Steve", 1));
        roster.record_seen(&with_id("Alex", 1));

        let record = roster.by_id(PersistentId(uuid::Uuid::from_u128(1))).unwrap();
        assert_eq!(record.identity.name(), "Alex");
    }
    #[test]
    fn test_record_seen_after_rename_frees_old_name() {
        let mut roster = OfflineRoster::new();
        roster.record_seen(&with_id("Steve", 1));
        roster.record_seen(&with_id("Alex", 1));

        let old = roster.get_or_create("Steve");

        assert_eq!(old.identity.name(), "Steve");
        assert_eq!(old.identity.id(), None);
        assert!(!old.has_played_before());
        assert_eq!(roster.len(), 2);
    }
}
