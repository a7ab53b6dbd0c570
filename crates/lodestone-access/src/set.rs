//! Reloadable membership sets.
//!
//! A [`MembershipSet`] is a plain hash set with two extra promises:
//!
//! - `all()` hands back a defensive copy, never a live view. What the
//!   caller holds does not change when the set does.
//! - `reload()` is copy-then-swap. The replacement is fully built from the
//!   backing store *before* the lock is taken, and the swap itself is a
//!   single pointer-sized move under a write lock. A reader on any thread
//!   sees the old contents or the new contents, never an empty or
//!   half-filled set in between.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::{ReloadFailure, StoreError};

/// Which access list a set represents. Used in logs and errors, and by
/// file-backed stores to pick a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bans,
    IpBans,
    Whitelist,
    Operators,
}

impl ListKind {
    /// All lists, in the order a full reload processes them.
    pub const ALL: [ListKind; 4] = [
        ListKind::Bans,
        ListKind::IpBans,
        ListKind::Whitelist,
        ListKind::Operators,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Bans => "banned-players.json",
            Self::IpBans => "banned-ips.json",
            Self::Whitelist => "whitelist.json",
            Self::Operators => "ops.json",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bans => write!(f, "bans"),
            Self::IpBans => write!(f, "ip-bans"),
            Self::Whitelist => write!(f, "whitelist"),
            Self::Operators => write!(f, "operators"),
        }
    }
}

/// A named, independently mutable set of keys (identities or addresses).
///
/// Membership tests are O(1) average. All methods take `&self`: the set is
/// internally synchronized, so admission checks running on network tasks
/// can read it while the owner thread reloads it.
pub struct MembershipSet<K> {
    kind: ListKind,
    entries: RwLock<HashSet<K>>,
}

impl<K> MembershipSet<K>
where
    K: Eq + Hash + Clone,
{
    /// An empty set.
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashSet::new()),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Adds a key. Returns `false` if it was already present.
    pub fn add(&self, key: K) -> bool {
        self.entries.write().insert(key)
    }

    /// Removes a key. Returns `false` if it wasn't present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.write().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains(key)
    }

    /// A point-in-time copy of the contents.
    pub fn all(&self) -> HashSet<K> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Replaces the whole contents. The new set is built first; the write
    /// lock is held only for the swap. Returns the new size.
    pub fn replace(&self, entries: impl IntoIterator<Item = K>) -> usize {
        let fresh: HashSet<K> = entries.into_iter().collect();
        let len = fresh.len();
        let previous = std::mem::replace(&mut *self.entries.write(), fresh);
        // Old set dropped outside the lock.
        drop(previous);
        len
    }

    /// Reloads from the backing store.
    ///
    /// `load` is the store read, e.g. `store.load_bans()`. While it is
    /// pending the set keeps serving the old contents. On failure nothing
    /// changes.
    pub async fn reload<Fut>(&self, load: Fut) -> Result<usize, ReloadFailure>
    where
        Fut: Future<Output = Result<Vec<K>, StoreError>>,
    {
        match load.await {
            Ok(entries) => {
                let count = self.replace(entries);
                tracing::info!(list = %self.kind, count, "access list reloaded");
                Ok(count)
            }
            Err(source) => {
                tracing::warn!(
                    list = %self.kind,
                    error = %source,
                    "access list reload failed, keeping previous contents"
                );
                Err(ReloadFailure {
                    list: self.kind,
                    source,
                })
            }
        }
    }
}

impl<K> fmt::Debug for MembershipSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipSet")
            .field("kind", &self.kind)
            .field("len", &self.entries.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(keys: &[&str]) -> MembershipSet<String> {
        let set = MembershipSet::new(ListKind::IpBans);
        set.replace(keys.iter().map(|k| k.to_string()));
        set
    }

    #[test]
    fn test_add_duplicate_returns_false() {
        let set = set_of(&[]);
        assert!(set.add("10.0.0.1".into()));
        assert!(!set.add("10.0.0.1".into()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_missing_returns_false() {
        let set = set_of(&["10.0.0.1"]);
        assert!(!set.remove(&"10.0.0.2".to_string()));
        assert!(set.remove(&"10.0.0.1".to_string()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_all_is_a_defensive_copy() {
        let set = set_of(&["a"]);
        let copy = set.all();

        set.add("b".into());

        assert_eq!(copy.len(), 1, "snapshot must not track later mutation");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_replace_drops_duplicates_and_returns_len() {
        let set = set_of(&[]);
        assert_eq!(set.replace(["x".to_string(), "x".to_string(), "y".to_string()]), 2);
    }

    #[tokio::test]
    async fn test_reload_success_replaces_contents() {
        let set = set_of(&["old"]);

        let count = set
            .reload(async { Ok::<_, StoreError>(vec!["new".to_string()]) })
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert!(set.contains(&"new".to_string()));
        assert!(!set.contains(&"old".to_string()));
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_contents() {
        let set = set_of(&["old"]);

        let result = set
            .reload(async { Err::<Vec<String>, _>(StoreError::Unavailable("disk gone".into())) })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.list, ListKind::IpBans);
        assert!(set.contains(&"old".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_list_kind_file_names_are_distinct() {
        let names: HashSet<_> = ListKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(names.len(), 4);
    }
}
