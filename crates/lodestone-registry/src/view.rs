//! The roster arena and the live view over it.
//!
//! Connected players live in an arena: a `Vec` of slots, each either empty
//! or holding one player. Two hash indexes (normalized name, persistent id)
//! point into the slots, so every identity-to-session lookup is O(1).
//!
//! The [`LiveView`] is not a copy of anything. It shares the arena with
//! the registry through an `Rc`, so a view obtained once keeps showing the
//! registry's *current* contents for the rest of the server's lifetime.
//!
//! # Owner thread only
//!
//! `LiveView` is `!Send` and `!Sync` (it holds an `Rc`). The compiler
//! therefore refuses any attempt to move or share it across threads; all
//! access happens on the thread that runs the server tick. Work that
//! originates elsewhere reaches the registry through the tick loop's
//! mutation queue.
//!
//! # Iteration hazard
//!
//! [`LiveView::iter`] walks the slots with a cursor and re-reads the arena
//! on every step. If the loop body disconnects a player (a kick, a ban that
//! boots them), later steps of the *same* iteration see the change: the
//! removed player is skipped if not yet visited, and a player who connects
//! into a freed slot behind the cursor is not visited at all. Callers that
//! mutate the registry while iterating should iterate over
//! [`LiveView::snapshot`] instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use lodestone_protocol::{PersistentId, PlayerIdentity, normalize_name};

use crate::ConnectedPlayer;

// ---------------------------------------------------------------------------
// Roster (arena + indexes)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct Roster {
    slots: Vec<Option<Rc<ConnectedPlayer>>>,
    /// Indexes of empty slots, reused before the `Vec` grows.
    free: Vec<usize>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<PersistentId, usize>,
    len: usize,
}

impl Roster {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn player(&self, slot: usize) -> Option<&Rc<ConnectedPlayer>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn by_normalized_name(&self, key: &str) -> Option<&Rc<ConnectedPlayer>> {
        self.by_name.get(key).and_then(|&slot| self.player(slot))
    }

    pub(crate) fn by_id(&self, id: &PersistentId) -> Option<&Rc<ConnectedPlayer>> {
        self.by_id.get(id).and_then(|&slot| self.player(slot))
    }

    /// Resolves an identity to its slot, honoring identity equality
    /// (ids first, then names).
    pub(crate) fn slot_of(&self, identity: &PlayerIdentity) -> Option<usize> {
        let slot = match identity.id() {
            Some(id) => self.by_id.get(&id).copied(),
            None => self.by_name.get(identity.normalized_name()).copied(),
        }?;
        let player = self.player(slot)?;
        (player.identity() == identity).then_some(slot)
    }

    pub(crate) fn insert(&mut self, player: Rc<ConnectedPlayer>) {
        let identity = player.identity();
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.by_name
            .insert(identity.normalized_name().to_string(), slot);
        if let Some(id) = identity.id() {
            self.by_id.insert(id, slot);
        }
        self.slots[slot] = Some(player);
        self.len += 1;
    }

    pub(crate) fn remove(&mut self, slot: usize) -> Option<Rc<ConnectedPlayer>> {
        let player = self.slots.get_mut(slot)?.take()?;
        self.by_name.remove(player.identity().normalized_name());
        if let Some(id) = player.identity().id() {
            self.by_id.remove(&id);
        }
        self.free.push(slot);
        self.len -= 1;
        Some(player)
    }

    /// First occupied slot at or after `cursor`, with its index.
    fn next_from(&self, cursor: usize) -> Option<(usize, Rc<ConnectedPlayer>)> {
        self.slots
            .iter()
            .enumerate()
            .skip(cursor)
            .find_map(|(slot, entry)| entry.as_ref().map(|p| (slot, Rc::clone(p))))
    }
}

// ---------------------------------------------------------------------------
// LiveView
// ---------------------------------------------------------------------------

/// A reused, registry-backed view of the currently connected players.
///
/// Cloning a `LiveView` (or calling
/// [`PlayerRegistry::live_view`](crate::PlayerRegistry::live_view)) bumps a
/// reference count; nothing is copied and nothing is allocated. Every
/// query reads the registry as it is *now*, not as it was when the view was
/// obtained.
///
/// See the [module docs](self) for the threading rule and the iteration
/// hazard.
#[derive(Clone)]
pub struct LiveView {
    roster: Rc<RefCell<Roster>>,
}

impl LiveView {
    pub(crate) fn new(roster: Rc<RefCell<Roster>>) -> Self {
        Self { roster }
    }

    /// Number of players connected right now.
    pub fn len(&self) -> usize {
        self.roster.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the identity currently has a session.
    pub fn contains(&self, identity: &PlayerIdentity) -> bool {
        self.roster.borrow().slot_of(identity).is_some()
    }

    /// Case-insensitive exact name lookup.
    pub fn get(&self, name: &str) -> Option<Rc<ConnectedPlayer>> {
        self.roster
            .borrow()
            .by_normalized_name(&normalize_name(name))
            .cloned()
    }

    /// Iterates the live contents. See the module docs for what happens if
    /// the registry changes mid-iteration.
    pub fn iter(&self) -> LiveIter<'_> {
        LiveIter {
            view: self,
            cursor: 0,
        }
    }

    /// A point-in-time copy, isolated from later registry changes.
    ///
    /// This is the only method on the view that allocates. Use it before
    /// any loop that kicks, bans, or otherwise disconnects players.
    pub fn snapshot(&self) -> Vec<Rc<ConnectedPlayer>> {
        self.iter().collect()
    }

    /// Whether two views are backed by the same registry.
    pub fn ptr_eq(&self, other: &LiveView) -> bool {
        Rc::ptr_eq(&self.roster, &other.roster)
    }
}

impl fmt::Debug for LiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView").field("len", &self.len()).finish()
    }
}

impl<'a> IntoIterator for &'a LiveView {
    type Item = Rc<ConnectedPlayer>;
    type IntoIter = LiveIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over the arena slots.
///
/// Holds no `RefCell` borrow between steps, so the registry can be mutated
/// while an iteration is in progress without panicking. What the remaining
/// steps then observe is described in the module docs.
pub struct LiveIter<'a> {
    view: &'a LiveView,
    cursor: usize,
}

impl Iterator for LiveIter<'_> {
    type Item = Rc<ConnectedPlayer>;

    fn next(&mut self) -> Option<Self::Item> {
        let (slot, player) = self.view.roster.borrow().next_from(self.cursor)?;
        self.cursor = slot + 1;
        Some(player)
    }
}
