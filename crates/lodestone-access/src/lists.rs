//! The four access lists, grouped.
//!
//! [`AccessControlSets`] owns the ban list, the IP-ban list, the whitelist
//! and the operator list. Each list is an independent [`MembershipSet`];
//! grouping them only gives the server one thing to reload and save.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use lodestone_protocol::PlayerIdentity;

use crate::{AccessStore, ListKind, MembershipSet, ReloadFailure, SaveFailure, StoreError};

/// Canonical form of a raw address string: trimmed, ASCII-lowercased
/// (IPv6 hex digits compare case-insensitively).
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Whitelist
// ---------------------------------------------------------------------------

/// The whitelist: a membership set plus an on/off switch.
///
/// When disabled, admission ignores membership entirely. The members are
/// kept either way, so toggling doesn't lose the list.
#[derive(Debug)]
pub struct Whitelist {
    members: MembershipSet<PlayerIdentity>,
    enabled: AtomicBool,
}

impl Whitelist {
    pub fn new(enabled: bool) -> Self {
        Self {
            members: MembershipSet::new(ListKind::Whitelist),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            tracing::info!(enabled, "whitelist toggled");
        }
    }

    pub fn add(&self, identity: PlayerIdentity) -> bool {
        self.members.add(identity)
    }

    pub fn remove(&self, identity: &PlayerIdentity) -> bool {
        self.members.remove(identity)
    }

    pub fn contains(&self, identity: &PlayerIdentity) -> bool {
        self.members.contains(identity)
    }

    pub fn all(&self) -> HashSet<PlayerIdentity> {
        self.members.all()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The underlying set, for reload/replace.
    pub fn members(&self) -> &MembershipSet<PlayerIdentity> {
        &self.members
    }
}

// ---------------------------------------------------------------------------
// AccessSnapshot
// ---------------------------------------------------------------------------

/// The contents of all four lists as read from a store, not yet applied.
///
/// Loading a snapshot doesn't touch any live set, so it can happen on any
/// task. Applying it is a handful of swaps and belongs on the owner
/// thread between ticks.
#[derive(Debug, Clone, Default)]
pub struct AccessSnapshot {
    pub bans: Vec<PlayerIdentity>,
    pub ip_bans: Vec<String>,
    pub whitelist: Vec<PlayerIdentity>,
    pub operators: Vec<PlayerIdentity>,
}

impl AccessSnapshot {
    /// Reads every list. Fails on the first list that can't be read.
    pub async fn load(store: &impl AccessStore) -> Result<Self, ReloadFailure> {
        fn failed(list: ListKind) -> impl FnOnce(StoreError) -> ReloadFailure {
            move |source| ReloadFailure { list, source }
        }

        Ok(Self {
            bans: store.load_bans().await.map_err(failed(ListKind::Bans))?,
            ip_bans: store
                .load_ip_bans()
                .await
                .map_err(failed(ListKind::IpBans))?
                .iter()
                .map(|a| normalize_address(a))
                .collect(),
            whitelist: store
                .load_whitelist()
                .await
                .map_err(failed(ListKind::Whitelist))?,
            operators: store
                .load_operators()
                .await
                .map_err(failed(ListKind::Operators))?,
        })
    }
}

// ---------------------------------------------------------------------------
// AccessControlSets
// ---------------------------------------------------------------------------

/// Bans, IP bans, whitelist and operators.
///
/// Every predicate here is pure: no logging, no I/O, no mutation. They are
/// safe to call from the connection-admission path before any session
/// exists.
#[derive(Debug)]
pub struct AccessControlSets {
    bans: MembershipSet<PlayerIdentity>,
    ip_bans: MembershipSet<String>,
    whitelist: Whitelist,
    operators: MembershipSet<PlayerIdentity>,
}

impl AccessControlSets {
    /// Empty lists; the whitelist switch starts at `whitelist_enabled`.
    pub fn new(whitelist_enabled: bool) -> Self {
        Self {
            bans: MembershipSet::new(ListKind::Bans),
            ip_bans: MembershipSet::new(ListKind::IpBans),
            whitelist: Whitelist::new(whitelist_enabled),
            operators: MembershipSet::new(ListKind::Operators),
        }
    }

    pub fn bans(&self) -> &MembershipSet<PlayerIdentity> {
        &self.bans
    }

    /// Raw address strings. Prefer [`ban_ip`](Self::ban_ip) and friends,
    /// which normalize the address first.
    pub fn ip_bans(&self) -> &MembershipSet<String> {
        &self.ip_bans
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn operators(&self) -> &MembershipSet<PlayerIdentity> {
        &self.operators
    }

    // -- predicates -------------------------------------------------------

    pub fn is_banned(&self, identity: &PlayerIdentity) -> bool {
        self.bans.contains(identity)
    }

    pub fn is_ip_banned(&self, address: &str) -> bool {
        self.ip_bans.contains(&normalize_address(address))
    }

    /// Whitelist membership, regardless of whether the whitelist is on.
    pub fn is_whitelisted(&self, identity: &PlayerIdentity) -> bool {
        self.whitelist.contains(identity)
    }

    pub fn is_op(&self, identity: &PlayerIdentity) -> bool {
        self.operators.contains(identity)
    }

    // -- address helpers --------------------------------------------------

    pub fn ban_ip(&self, address: &str) -> bool {
        self.ip_bans.add(normalize_address(address))
    }

    pub fn unban_ip(&self, address: &str) -> bool {
        self.ip_bans.remove(&normalize_address(address))
    }

    // -- reload -----------------------------------------------------------

    pub async fn reload_bans(&self, store: &impl AccessStore) -> Result<usize, ReloadFailure> {
        self.bans.reload(store.load_bans()).await
    }

    pub async fn reload_ip_bans(&self, store: &impl AccessStore) -> Result<usize, ReloadFailure> {
        self.ip_bans
            .reload(async {
                let raw = store.load_ip_bans().await?;
                Ok::<_, StoreError>(raw.iter().map(|a| normalize_address(a)).collect())
            })
            .await
    }

    pub async fn reload_whitelist(&self, store: &impl AccessStore) -> Result<usize, ReloadFailure> {
        self.whitelist.members.reload(store.load_whitelist()).await
    }

    pub async fn reload_operators(&self, store: &impl AccessStore) -> Result<usize, ReloadFailure> {
        self.operators.reload(store.load_operators()).await
    }

    /// Reloads all four lists, all-or-nothing: every list is read first,
    /// and only if all reads succeed are the sets swapped.
    pub async fn reload_all(&self, store: &impl AccessStore) -> Result<(), ReloadFailure> {
        let snapshot = AccessSnapshot::load(store).await.inspect_err(|failure| {
            tracing::warn!(error = %failure, "access lists reload failed, keeping previous contents");
        })?;
        self.apply(snapshot);
        Ok(())
    }

    /// Swaps every set to the snapshot's contents.
    pub fn apply(&self, snapshot: AccessSnapshot) {
        let bans = self.bans.replace(snapshot.bans);
        let ip_bans = self.ip_bans.replace(snapshot.ip_bans);
        let whitelist = self.whitelist.members.replace(snapshot.whitelist);
        let operators = self.operators.replace(snapshot.operators);
        tracing::info!(bans, ip_bans, whitelist, operators, "access lists applied");
    }

    // -- save -------------------------------------------------------------

    /// Writes every list to the store. All four writes are attempted; the
    /// first failure is returned.
    pub async fn save_all(&self, store: &impl AccessStore) -> Result<(), SaveFailure> {
        let results = [
            (
                ListKind::Bans,
                store.save_bans(self.bans.all().into_iter().collect()).await,
            ),
            (
                ListKind::IpBans,
                store
                    .save_ip_bans(self.ip_bans.all().into_iter().collect())
                    .await,
            ),
            (
                ListKind::Whitelist,
                store
                    .save_whitelist(self.whitelist.all().into_iter().collect())
                    .await,
            ),
            (
                ListKind::Operators,
                store
                    .save_operators(self.operators.all().into_iter().collect())
                    .await,
            ),
        ];

        let mut first_failure = None;
        for (list, result) in results {
            if let Err(source) = result {
                tracing::warn!(%list, error = %source, "failed to save access list");
                first_failure.get_or_insert(SaveFailure { list, source });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl Default for AccessControlSets {
    fn default() -> Self {
        Self::new(false)
    }
}
