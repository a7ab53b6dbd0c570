//! Live player registry for Lodestone.
//!
//! This crate tracks who is on the server:
//!
//! 1. **Sessions**: one [`ConnectedPlayer`] per connected identity,
//!    owned by the [`PlayerRegistry`]
//! 2. **Live view**: a reused, never-copied [`LiveView`] over the
//!    registry that always reflects the current player set
//! 3. **History**: [`OfflineRoster`] records for every identity ever seen
//!    or asked about
//!
//! # How it fits in the stack
//!
//! ```text
//! Server facade (above)  ← admission policy, broadcast, commands
//!     ↕
//! Registry (this crate)  ← who is connected, right now
//!     ↕
//! Protocol (below)       ← PlayerIdentity
//! ```
//!
//! Everything here is single-threaded by construction (`Rc`-based and
//! `!Send`); it is owned by the server's tick thread.

mod error;
mod offline;
mod player;
mod registry;
mod view;

pub use error::RegistryError;
pub use offline::{OfflinePlayerRecord, OfflineRoster};
pub use player::{ConnectedPlayer, ConnectionHandle, ConnectionId, Outbound, PlayerSender};
pub use registry::PlayerRegistry;
pub use view::{LiveIter, LiveView};
