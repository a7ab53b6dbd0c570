//! The player registry: the canonical set of connected players.
//!
//! The registry is deliberately policy-agnostic. It doesn't know about
//! bans, whitelists or player caps; the server facade checks those before
//! calling [`PlayerRegistry::connect`]. The only rule enforced here is the
//! invariant the rest of the server leans on: **at most one session per
//! identity, and at most one session per (case-folded) name.**
//!
//! # Concurrency note
//!
//! Like the rest of the live state, `PlayerRegistry` is single-threaded
//! (`!Send`). It belongs to the task that runs the server tick; other
//! tasks hand it work through the tick loop's mutation queue.

use std::cell::RefCell;
use std::rc::Rc;

use lodestone_protocol::{PersistentId, PlayerIdentity, normalize_name};

use crate::view::Roster;
use crate::{ConnectedPlayer, ConnectionHandle, LiveView, RegistryError};

/// Owns every [`ConnectedPlayer`] and hands out the [`LiveView`].
///
/// ## Lifecycle of an entry
///
/// ```text
/// connect() ──→ [online] ──→ disconnect() ──→ handle reports offline
///                  │
///                  └── visible through every LiveView while online
/// ```
pub struct PlayerRegistry {
    roster: Rc<RefCell<Roster>>,
    /// The one view this registry hands out, cloned on request.
    view: LiveView,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        let roster = Rc::new(RefCell::new(Roster::default()));
        let view = LiveView::new(Rc::clone(&roster));
        Self { roster, view }
    }

    /// Registers a new session for `identity`.
    ///
    /// # Errors
    /// - [`RegistryError::AlreadyConnected`] if the identity has a session.
    /// - [`RegistryError::DuplicateIdentity`] if a different identity is
    ///   connected under the same name.
    pub fn connect(
        &mut self,
        identity: PlayerIdentity,
        connection: ConnectionHandle,
    ) -> Result<Rc<ConnectedPlayer>, RegistryError> {
        let mut roster = self.roster.borrow_mut();

        if roster.slot_of(&identity).is_some() {
            return Err(RegistryError::AlreadyConnected(identity));
        }
        if let Some(existing) = roster.by_normalized_name(identity.normalized_name()) {
            return Err(RegistryError::DuplicateIdentity {
                existing: existing.identity().clone(),
                requested: identity,
            });
        }

        let player = Rc::new(ConnectedPlayer::new(identity, connection));
        roster.insert(Rc::clone(&player));

        tracing::info!(
            identity = %player.identity(),
            address = %player.address(),
            connection = %player.connection_id(),
            online = roster.len(),
            "player connected"
        );
        Ok(player)
    }

    /// Removes the session for `identity` and returns it.
    ///
    /// The returned handle already reports `is_online() == false`. Safe to
    /// call while a [`LiveView`] iteration is in progress (see the view's
    /// docs for what that iteration observes afterwards).
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the identity isn't connected.
    /// Nothing is changed in that case.
    pub fn disconnect(
        &mut self,
        identity: &PlayerIdentity,
    ) -> Result<Rc<ConnectedPlayer>, RegistryError> {
        let mut roster = self.roster.borrow_mut();
        let player = roster
            .slot_of(identity)
            .and_then(|slot| roster.remove(slot))
            .ok_or_else(|| RegistryError::NotFound(identity.clone()))?;

        player.mark_offline();
        tracing::info!(
            identity = %player.identity(),
            online = roster.len(),
            "player disconnected"
        );
        Ok(player)
    }

    /// The live view of connected players. Same backing object every call;
    /// no allocation.
    pub fn live_view(&self) -> LiveView {
        self.view.clone()
    }

    /// Resolves a name typed by a user (or a textual persistent id) to a
    /// connected player.
    ///
    /// Tries the case-insensitive exact name first, then falls back to
    /// parsing `name` as a UUID. Never matches partial names.
    pub fn lookup(&self, name: &str) -> Option<Rc<ConnectedPlayer>> {
        self.by_exact_name(name).or_else(|| {
            let id = PersistentId::parse(name)?;
            self.by_id(&id)
        })
    }

    /// Case-insensitive, full-string name match. `"steve"` finds `"Steve"`,
    /// `"Stev"` finds nothing.
    pub fn by_exact_name(&self, name: &str) -> Option<Rc<ConnectedPlayer>> {
        self.roster
            .borrow()
            .by_normalized_name(&normalize_name(name))
            .cloned()
    }

    pub fn by_id(&self, id: &PersistentId) -> Option<Rc<ConnectedPlayer>> {
        self.roster.borrow().by_id(id).cloned()
    }

    /// The session for exactly this identity, if any.
    pub fn get(&self, identity: &PlayerIdentity) -> Option<Rc<ConnectedPlayer>> {
        let roster = self.roster.borrow();
        let slot = roster.slot_of(identity)?;
        roster.player(slot).cloned()
    }

    pub fn contains(&self, identity: &PlayerIdentity) -> bool {
        self.roster.borrow().slot_of(identity).is_some()
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.roster.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `PlayerRegistry`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use lodestone_protocol::PersistentId;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn conn() -> ConnectionHandle {
        ConnectionHandle::channel("127.0.0.1").0
    }

    fn named(name: &str) -> PlayerIdentity {
        PlayerIdentity::new(name)
    }

    fn with_id(name: &str, n: u128) -> PlayerIdentity {
        PlayerIdentity::with_id(name, PersistentId(uuid_from(n)))
    }

    fn uuid_from(n: u128) -> uuid::Uuid {
        uuid::Uuid::from_u128(n)
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[test]
    fn test_connect_new_player_is_online() {
        let mut reg = PlayerRegistry::new();

        let player = reg.connect(named("Steve"), conn()).expect("should connect");

        assert!(player.is_online());
        assert_eq!(player.name(), "Steve");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_connect_twice_returns_already_connected() {
        let mut reg = PlayerRegistry::new();
        reg.connect(named("Steve"), conn()).unwrap();

        let result = reg.connect(named("steve"), conn());

        assert!(matches!(result, Err(RegistryError::AlreadyConnected(_))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_connect_same_id_different_name_returns_already_connected() {
        let mut reg = PlayerRegistry::new();
        reg.connect(with_id("Steve", 1), conn()).unwrap();

        let result = reg.connect(with_id("Alex", 1), conn());

        assert!(matches!(result, Err(RegistryError::AlreadyConnected(_))));
    }

    #[test]
    fn test_connect_name_taken_by_other_identity_returns_duplicate() {
        let mut reg = PlayerRegistry::new();
        reg.connect(with_id("Steve", 1), conn()).unwrap();

        let result = reg.connect(with_id("STEVE", 2), conn());

        assert!(matches!(
            result,
            Err(RegistryError::DuplicateIdentity { ref existing, .. })
                if existing.id() == Some(PersistentId(uuid_from(1)))
        ));
    }

    #[test]
    fn test_connect_after_disconnect_succeeds() {
        let mut reg = PlayerRegistry::new();
        reg.connect(named("Steve"), conn()).unwrap();
        reg.disconnect(&named("Steve")).unwrap();

        assert!(reg.connect(named("Steve"), conn()).is_ok());
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_marks_handle_offline() {
        let mut reg = PlayerRegistry::new();
        let handle = reg.connect(named("Steve"), conn()).unwrap();

        let removed = reg.disconnect(&named("Steve")).unwrap();

        assert!(Rc::ptr_eq(&handle, &removed));
        assert!(!handle.is_online());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_disconnect_unknown_returns_not_found() {
        let mut reg = PlayerRegistry::new();
        reg.connect(named("Steve"), conn()).unwrap();

        let result = reg.disconnect(&named("Alex"));

        assert!(matches!(result, Err(RegistryError::NotFound(_))));
        assert_eq!(reg.len(), 1, "a miss must not change the registry");
    }

    #[test]
    fn test_disconnect_name_match_but_id_mismatch_returns_not_found() {
        // "Steve" with an id is not the same identity as a bare "Steve".
        let mut reg = PlayerRegistry::new();
        reg.connect(with_id("Steve", 1), conn()).unwrap();

        assert!(reg.disconnect(&named("Steve")).is_err());
        assert!(reg.disconnect(&with_id("Steve", 2)).is_err());
        assert!(reg.disconnect(&with_id("whatever", 1)).is_ok());
    }

    // =====================================================================
    // lookups
    // =====================================================================

    #[test]
    fn test_by_exact_name_is_case_insensitive_and_exact() {
        let mut reg = PlayerRegistry::new();
        reg.connect(named("Steve"), conn()).unwrap();

        let upper = reg.by_exact_name("Steve").unwrap();
        let lower = reg.by_exact_name("steve").unwrap();

        assert!(Rc::ptr_eq(&upper, &lower));
        assert!(reg.by_exact_name("Stev").is_none());
        assert!(reg.by_exact_name("Steve2").is_none());
    }

    #[test]
    fn test_lookup_falls_back_to_persistent_id() {
        let mut reg = PlayerRegistry::new();
        reg.connect(with_id("Steve", 5), conn()).unwrap();

        let by_name = reg.lookup("STEVE").unwrap();
        let by_uuid = reg
            .lookup("00000000-0000-0000-0000-000000000005")
            .unwrap();

        assert!(Rc::ptr_eq(&by_name, &by_uuid));
        assert!(reg.lookup("00000000-0000-0000-0000-000000000006").is_none());
    }

    #[test]
    fn test_get_requires_equal_identity() {
        let mut reg = PlayerRegistry::new();
        reg.connect(with_id("Steve", 1), conn()).unwrap();

        assert!(reg.get(&with_id("Renamed", 1)).is_some());
        assert!(reg.get(&named("Steve")).is_none());
        assert!(reg.contains(&with_id("Steve", 1)));
    }

    #[test]
    fn test_live_view_is_same_object_every_call() {
        let reg = PlayerRegistry::new();
        assert!(reg.live_view().ptr_eq(&reg.live_view()));
    }
}
