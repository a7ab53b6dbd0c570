//! # Lodestone
//!
//! A game-server facade: the live player registry, the access lists that
//! gate it, and broadcast and command dispatch on top.
//!
//! ## Layers
//!
//! ```text
//! lodestone           ← Server facade, lifecycle, owner loop (this crate)
//!   ├── lodestone-access    ← bans, IP bans, whitelist, operators
//!   ├── lodestone-registry  ← connected players and the live view
//!   ├── lodestone-tick      ← tick scheduler and mutation queue
//!   └── lodestone-protocol  ← PlayerIdentity, codecs
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lodestone::prelude::*;
//!
//! # async fn demo() -> Result<(), ServerError> {
//! let server = Server::builder(JsonFileStore::new("./data"))
//!     .worlds(StaticWorlds::named(["world"]))
//!     .build();
//! let server_loop = ServerLoop::new(server);
//! let handle = server_loop.handle();
//! // hand `handle` to the network layer, then:
//! let stopped = server_loop.run().await?;
//! # drop((handle, stopped));
//! # Ok(())
//! # }
//! ```

mod command;
mod config;
mod error;
mod permission;
mod runtime;
mod server;
mod state;
mod world;

pub use command::{
    CommandExecutionFailure, CommandExecutor, CommandLine, CommandMap, CommandSender,
    ConsoleSender, HandlerError,
};
pub use config::{ConfigError, GameMode, ServerProperties, UnknownGameMode};
pub use error::ServerError;
pub use permission::{
    BROADCAST_CHANNEL_ADMINISTRATIVE, BROADCAST_CHANNEL_USERS, DefaultPermissions,
    PermissionEvaluator,
};
pub use runtime::{ServerHandle, ServerLoop};
pub use server::{
    COMMAND_FAILED_MESSAGE, IDLE_KICK_MESSAGE, ReloadedConfig, SHUTDOWN_MESSAGE, Server,
    ServerBuilder,
};
pub use state::ServerState;
pub use world::{NamedWorld, StaticWorlds, World, WorldLookup, WorldReloadError};

/// Re-exports of the most commonly used types across all Lodestone crates.
pub mod prelude {
    pub use crate::{
        BROADCAST_CHANNEL_ADMINISTRATIVE, BROADCAST_CHANNEL_USERS, CommandExecutor, CommandMap,
        CommandSender, ConsoleSender, DefaultPermissions, GameMode, HandlerError,
        PermissionEvaluator, ReloadedConfig, Server, ServerError, ServerHandle, ServerLoop, ServerProperties,
        ServerState, StaticWorlds, World, WorldLookup,
    };
    pub use lodestone_access::{
        AccessControlSets, AccessSnapshot, AccessStore, Admission, DenyReason, JsonFileStore,
        MemoryStore,
    };
    pub use lodestone_protocol::{PersistentId, PlayerIdentity};
    pub use lodestone_registry::{
        ConnectedPlayer, ConnectionHandle, LiveView, OfflinePlayerRecord, Outbound,
    };
    pub use lodestone_tick::{TickConfig, TickScheduler};
}
