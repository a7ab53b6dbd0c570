//! Access control for Lodestone: bans, IP bans, whitelist, operators.
//!
//! # Key types
//!
//! - [`MembershipSet`]: a reloadable set with copy-then-swap semantics
//! - [`Whitelist`]: membership plus an enable switch
//! - [`AccessControlSets`]: the four lists together, plus the
//!   [admission check](AccessControlSets::check_admission)
//! - [`AccessStore`]: the persistence hook ([`JsonFileStore`],
//!   [`MemoryStore`])
//!
//! Lists hold [`PlayerIdentity`](lodestone_protocol::PlayerIdentity) values
//! (or address strings), never live sessions, so nothing here can dangle
//! when a player disconnects.

mod admission;
mod error;
mod lists;
mod set;
mod store;

pub use admission::{Admission, DenyReason};
pub use error::{ReloadFailure, SaveFailure, StoreError};
pub use lists::{AccessControlSets, AccessSnapshot, Whitelist, normalize_address};
pub use set::{ListKind, MembershipSet};
pub use store::{AccessStore, JsonFileStore, MemoryStore};
