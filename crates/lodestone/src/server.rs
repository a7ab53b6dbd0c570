//! The server facade.
//!
//! [`Server`] is the composition root: it owns the player registry, the
//! offline roster and the access lists, and it holds the world, command
//! and permission collaborators. Every external caller (network layer,
//! console, plugins) goes through it.
//!
//! There is no global "current server". Build one with
//! [`Server::builder`], then pass it (or a
//! [`ServerHandle`](crate::ServerHandle) from the owner loop) to whatever
//! needs it.
//!
//! # Lifecycle
//!
//! ```text
//! builder().build() ──→ Starting ──start()──→ Running ──shutdown()──→ Stopped
//! ```
//!
//! Registry and access-list operations need `Running`. Calls made while
//! `Starting` fail with [`ServerError::NotRunning`]; calls after shutdown
//! fail with [`ServerError::Stopped`].
//!
//! # Threading
//!
//! `Server` is `!Send`. It lives on the owner task together with the
//! registry's live view; other tasks reach it through the mutation queue.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use lodestone_access::{
    AccessControlSets, AccessSnapshot, AccessStore, Admission, DenyReason, MemoryStore,
};
use lodestone_protocol::{PersistentId, PlayerIdentity};
use lodestone_registry::{
    ConnectedPlayer, ConnectionHandle, LiveView, OfflinePlayerRecord, OfflineRoster,
    PlayerRegistry,
};
use tracing::{debug, error, info, warn};

use crate::command::{CommandExecutionFailure, CommandLine};
use crate::permission::BROADCAST_CHANNEL_USERS;
use crate::{
    CommandExecutor, CommandMap, CommandSender, ConsoleSender, DefaultPermissions, GameMode,
    PermissionEvaluator, ServerError, ServerProperties, ServerState, StaticWorlds, World,
    WorldLookup,
};

/// Reason shown to players disconnected by [`Server::shutdown`].
pub const SHUTDOWN_MESSAGE: &str = "Server closed";

/// Reason shown to players removed by [`Server::kick_idle_players`].
pub const IDLE_KICK_MESSAGE: &str = "You have been idle for too long!";

/// Reply sent to a sender whose command handler failed.
pub const COMMAND_FAILED_MESSAGE: &str =
    "An internal error occurred while attempting to perform this command";

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

/// Configuration read from disk and the access store, not yet applied.
///
/// Loading does I/O and touches nothing on the server, so it can run on
/// any task. [`Server::apply_reload`] swaps it in on the owner.
#[derive(Debug)]
pub struct ReloadedConfig {
    properties: Option<ServerProperties>,
    access: AccessSnapshot,
}

impl ReloadedConfig {
    /// Reads the properties file at `properties_path` (if any) and all
    /// four access lists.
    pub async fn load(
        store: &impl AccessStore,
        properties_path: Option<&Path>,
    ) -> Result<Self, ServerError> {
        let properties = match properties_path {
            Some(path) => Some(ServerProperties::load(path).await?),
            None => None,
        };
        let access = AccessSnapshot::load(store).await?;
        Ok(Self { properties, access })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`Server`].
///
/// Only the access store is required. Everything else has a default:
/// [`ServerProperties::default`], no worlds, an empty [`CommandMap`], and
/// [`DefaultPermissions`].
///
/// # Example
///
/// ```rust,ignore
/// let mut server = Server::builder(JsonFileStore::new("./data"))
///     .properties(ServerProperties::load("server.toml").await?)
///     .properties_path("server.toml")
///     .worlds(StaticWorlds::named(["world"]))
///     .build();
/// server.start().await?;
/// ```
pub struct ServerBuilder<S: AccessStore> {
    store: Arc<S>,
    properties: ServerProperties,
    properties_path: Option<PathBuf>,
    worlds: Box<dyn WorldLookup>,
    commands: Box<dyn CommandExecutor>,
    permissions: Box<dyn PermissionEvaluator>,
}

impl<S: AccessStore> ServerBuilder<S> {
    pub fn new(store: S) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Uses a store that other tasks also hold.
    pub fn with_shared_store(store: Arc<S>) -> Self {
        Self {
            store,
            properties: ServerProperties::default(),
            properties_path: None,
            worlds: Box::new(StaticWorlds::default()),
            commands: Box::new(CommandMap::new()),
            permissions: Box::new(DefaultPermissions::new()),
        }
    }

    pub fn properties(mut self, properties: ServerProperties) -> Self {
        self.properties = properties.validated();
        self
    }

    /// File that [`Server::reload`] re-reads the properties from.
    pub fn properties_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties_path = Some(path.into());
        self
    }

    pub fn worlds(mut self, worlds: impl WorldLookup + 'static) -> Self {
        self.worlds = Box::new(worlds);
        self
    }

    pub fn commands(mut self, commands: impl CommandExecutor + 'static) -> Self {
        self.commands = Box::new(commands);
        self
    }

    pub fn permissions(mut self, permissions: impl PermissionEvaluator + 'static) -> Self {
        self.permissions = Box::new(permissions);
        self
    }

    /// Builds the server in the `Starting` state.
    pub fn build(self) -> Server<S> {
        let access = AccessControlSets::new(self.properties.white_list);
        Server {
            state: ServerState::Starting,
            properties: self.properties,
            properties_path: self.properties_path,
            registry: PlayerRegistry::new(),
            offline: OfflineRoster::new(),
            access,
            store: self.store,
            worlds: self.worlds,
            commands: self.commands,
            permissions: self.permissions,
            console: ConsoleSender,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// The single entry point to a game server's players and policy.
pub struct Server<S: AccessStore = MemoryStore> {
    state: ServerState,
    properties: ServerProperties,
    properties_path: Option<PathBuf>,
    registry: PlayerRegistry,
    offline: OfflineRoster,
    access: AccessControlSets,
    store: Arc<S>,
    worlds: Box<dyn WorldLookup>,
    commands: Box<dyn CommandExecutor>,
    permissions: Box<dyn PermissionEvaluator>,
    console: ConsoleSender,
}

impl<S: AccessStore> Server<S> {
    pub fn builder(store: S) -> ServerBuilder<S> {
        ServerBuilder::new(store)
    }

    /// Loads the access lists and moves `Starting → Running`.
    ///
    /// If the lists can't be read the server stays in `Starting` and the
    /// error is returned; calling `start` again retries.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Starting {
            return Err(self.refusal());
        }
        self.access.reload_all(&*self.store).await?;
        self.transition(ServerState::Running);
        info!(
            server_name = %self.properties.server_name,
            max_players = self.properties.max_players,
            whitelist = self.access.whitelist().is_enabled(),
            "server started"
        );
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    fn transition(&mut self, target: ServerState) {
        debug_assert!(self.state.can_transition_to(target));
        debug!(from = %self.state, to = %target, "server state transition");
        self.state = target;
    }

    fn refusal(&self) -> ServerError {
        match self.state {
            ServerState::Stopped => ServerError::Stopped,
            other => ServerError::NotRunning(other),
        }
    }

    fn ensure_running(&self) -> Result<(), ServerError> {
        if self.state.is_running() {
            Ok(())
        } else {
            Err(self.refusal())
        }
    }

    /// Settings and server info stay readable (and writable) while
    /// `Starting`, so bootstrap code can configure the server. Only
    /// `Stopped` refuses them.
    fn ensure_not_stopped(&self) -> Result<(), ServerError> {
        if self.state.is_stopped() {
            Err(ServerError::Stopped)
        } else {
            Ok(())
        }
    }

    // =====================================================================
    // Admission and the registry
    // =====================================================================

    /// Decides whether `identity`, connecting from `address`, may join.
    ///
    /// Checks run in order: ban, IP ban, whitelist (operators bypass it),
    /// then the player cap. Has no side effects.
    pub fn can_connect(
        &self,
        identity: &PlayerIdentity,
        address: &str,
    ) -> Result<Admission, ServerError> {
        self.ensure_running()?;
        let admission = match self.access.check_admission(identity, address) {
            Admission::Admitted if self.registry.len() >= self.properties.max_players => {
                Admission::Denied(DenyReason::ServerFull)
            }
            other => other,
        };
        if let Admission::Denied(reason) = admission {
            debug!(%identity, %address, ?reason, "admission denied");
        }
        Ok(admission)
    }

    /// Admits and registers a player.
    ///
    /// Runs [`can_connect`](Self::can_connect) first. On success the player
    /// is placed in the first world and their offline record is stamped.
    pub fn connect(
        &mut self,
        identity: PlayerIdentity,
        connection: ConnectionHandle,
    ) -> Result<Rc<ConnectedPlayer>, ServerError> {
        if let Admission::Denied(reason) = self.can_connect(&identity, connection.address())? {
            return Err(ServerError::Denied(reason));
        }
        let player = self.registry.connect(identity, connection)?;
        self.offline.record_seen(player.identity());
        if let Some(world) = self.worlds.worlds().first() {
            player.set_world(Some(world.name().to_string()));
        }
        Ok(player)
    }

    /// Ends a player's session. Safe while a live-view iteration is in
    /// progress.
    pub fn disconnect(
        &mut self,
        identity: &PlayerIdentity,
    ) -> Result<Rc<ConnectedPlayer>, ServerError> {
        self.ensure_running()?;
        let player = self.registry.disconnect(identity)?;
        self.offline.record_seen(player.identity());
        Ok(player)
    }

    /// Sends `reason` to the player, then disconnects them.
    pub fn kick_player(
        &mut self,
        identity: &PlayerIdentity,
        reason: &str,
    ) -> Result<Rc<ConnectedPlayer>, ServerError> {
        self.ensure_running()?;
        if let Some(player) = self.registry.get(identity) {
            player.kick(reason);
        }
        let player = self.disconnect(identity)?;
        info!(identity = %player.identity(), %reason, "player kicked");
        Ok(player)
    }

    /// Kicks every player idle for at least the idle timeout. Returns how
    /// many were kicked; 0 when the timeout is disabled.
    pub fn kick_idle_players(&mut self) -> Result<usize, ServerError> {
        self.ensure_running()?;
        let Some(timeout) = self.idle_timeout()? else {
            return Ok(0);
        };

        let mut kicked = 0;
        for player in self.registry.live_view().snapshot() {
            if player.idle_for() >= timeout {
                self.kick_player(player.identity(), IDLE_KICK_MESSAGE)?;
                kicked += 1;
            }
        }
        Ok(kicked)
    }

    /// The reused live view of connected players.
    ///
    /// Same object on every call. See
    /// [`LiveView`](lodestone_registry::LiveView) for the owner-thread rule
    /// and the iteration hazard.
    pub fn live_view(&self) -> Result<LiveView, ServerError> {
        self.ensure_running()?;
        Ok(self.registry.live_view())
    }

    /// Case-insensitive exact name, falling back to a textual persistent
    /// id. Connected players only.
    pub fn lookup(&self, name: &str) -> Result<Option<Rc<ConnectedPlayer>>, ServerError> {
        self.ensure_running()?;
        Ok(self.registry.lookup(name))
    }

    pub fn by_exact_name(&self, name: &str) -> Result<Option<Rc<ConnectedPlayer>>, ServerError> {
        self.ensure_running()?;
        Ok(self.registry.by_exact_name(name))
    }

    pub fn player_by_id(
        &self,
        id: &PersistentId,
    ) -> Result<Option<Rc<ConnectedPlayer>>, ServerError> {
        self.ensure_running()?;
        Ok(self.registry.by_id(id))
    }

    pub fn online_count(&self) -> Result<usize, ServerError> {
        self.ensure_running()?;
        Ok(self.registry.len())
    }

    // =====================================================================
    // Offline players
    // =====================================================================

    /// The record for `name`, created on first lookup. Never fails while
    /// running, never blocks.
    pub fn offline_player(&mut self, name: &str) -> Result<OfflinePlayerRecord, ServerError> {
        self.ensure_running()?;
        Ok(self.offline.get_or_create(name).clone())
    }

    /// The record for a persistent id, if that id has ever been seen.
    pub fn offline_player_by_id(
        &self,
        id: PersistentId,
    ) -> Result<Option<OfflinePlayerRecord>, ServerError> {
        self.ensure_running()?;
        Ok(self.offline.by_id(id).cloned())
    }

    // =====================================================================
    // Access lists
    // =====================================================================

    /// The raw access lists, for predicates and bulk reads.
    pub fn access(&self) -> Result<&AccessControlSets, ServerError> {
        self.ensure_running()?;
        Ok(&self.access)
    }

    pub fn is_banned(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        Ok(self.access()?.is_banned(identity))
    }

    pub fn is_whitelisted(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        Ok(self.access()?.is_whitelisted(identity))
    }

    pub fn is_op(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        Ok(self.access()?.is_op(identity))
    }

    /// Adds `identity` to the ban list. Does not disconnect them; pair
    /// with [`kick_player`](Self::kick_player) for that.
    ///
    /// Entries match by identity: a name-only identity never matches a
    /// player who connects with a persistent id. To ban by name, resolve
    /// the name first with [`offline_player`](Self::offline_player), which
    /// returns the id-bearing identity of whoever last used it. The same
    /// holds for the whitelist and operators.
    pub fn ban(&self, identity: PlayerIdentity) -> Result<bool, ServerError> {
        let access = self.access()?;
        info!(%identity, "player banned");
        Ok(access.bans().add(identity))
    }

    pub fn pardon(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        let removed = self.access()?.bans().remove(identity);
        if removed {
            info!(%identity, "player pardoned");
        }
        Ok(removed)
    }

    pub fn banned_players(&self) -> Result<Vec<PlayerIdentity>, ServerError> {
        Ok(self.access()?.bans().all().into_iter().collect())
    }

    pub fn ban_ip(&self, address: &str) -> Result<bool, ServerError> {
        let access = self.access()?;
        info!(%address, "address banned");
        Ok(access.ban_ip(address))
    }

    pub fn unban_ip(&self, address: &str) -> Result<bool, ServerError> {
        let removed = self.access()?.unban_ip(address);
        if removed {
            info!(%address, "address unbanned");
        }
        Ok(removed)
    }

    pub fn ip_bans(&self) -> Result<Vec<String>, ServerError> {
        Ok(self.access()?.ip_bans().all().into_iter().collect())
    }

    pub fn whitelist_add(&self, identity: PlayerIdentity) -> Result<bool, ServerError> {
        let access = self.access()?;
        info!(%identity, "added to whitelist");
        Ok(access.whitelist().add(identity))
    }

    pub fn whitelist_remove(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        let removed = self.access()?.whitelist().remove(identity);
        if removed {
            info!(%identity, "removed from whitelist");
        }
        Ok(removed)
    }

    pub fn whitelisted_players(&self) -> Result<Vec<PlayerIdentity>, ServerError> {
        Ok(self.access()?.whitelist().all().into_iter().collect())
    }

    /// Whether the whitelist is enforced.
    pub fn has_whitelist(&self) -> Result<bool, ServerError> {
        Ok(self.access()?.whitelist().is_enabled())
    }

    pub fn set_whitelist(&self, enabled: bool) -> Result<(), ServerError> {
        self.access()?.whitelist().set_enabled(enabled);
        Ok(())
    }

    /// Re-reads only the whitelist from the store.
    pub async fn reload_whitelist(&self) -> Result<usize, ServerError> {
        let access = self.access()?;
        Ok(access.reload_whitelist(&*self.store).await?)
    }

    pub fn op(&self, identity: PlayerIdentity) -> Result<bool, ServerError> {
        let access = self.access()?;
        info!(%identity, "made operator");
        Ok(access.operators().add(identity))
    }

    pub fn deop(&self, identity: &PlayerIdentity) -> Result<bool, ServerError> {
        let removed = self.access()?.operators().remove(identity);
        if removed {
            info!(%identity, "operator removed");
        }
        Ok(removed)
    }

    pub fn operators(&self) -> Result<Vec<PlayerIdentity>, ServerError> {
        Ok(self.access()?.operators().all().into_iter().collect())
    }

    /// Applies lists that were loaded elsewhere (see
    /// [`AccessSnapshot::load`]). Meant to run as a queued mutation
    /// between ticks.
    pub fn apply_access_snapshot(&self, snapshot: AccessSnapshot) -> Result<(), ServerError> {
        self.access()?.apply(snapshot);
        Ok(())
    }

    /// Writes all four lists to the store.
    pub async fn save_access_lists(&self) -> Result<(), ServerError> {
        let access = self.access()?;
        Ok(access.save_all(&*self.store).await?)
    }

    pub fn store(&self) -> Result<&Arc<S>, ServerError> {
        self.ensure_not_stopped()?;
        Ok(&self.store)
    }

    pub(crate) fn shared_store(&self) -> &Arc<S> {
        &self.store
    }

    // =====================================================================
    // Broadcast
    // =====================================================================

    /// Sends `text` to every player holding the users' broadcast
    /// permission. Returns the number of recipients.
    pub fn broadcast_message(&self, text: &str) -> Result<usize, ServerError> {
        self.broadcast(text, BROADCAST_CHANNEL_USERS)
    }

    /// Sends `text` to every connected player whose permissions include
    /// `permission`. Returns the number of players the message actually
    /// reached, not the registry size.
    pub fn broadcast(&self, text: &str, permission: &str) -> Result<usize, ServerError> {
        self.ensure_running()?;
        let recipients = self
            .registry
            .live_view()
            .iter()
            .filter(|p| self.permissions.has_permission(p.identity(), permission))
            .filter(|p| p.send_message(text))
            .count();
        self.console.send_message(text);
        debug!(%permission, recipients, "broadcast delivered");
        Ok(recipients)
    }

    // =====================================================================
    // Commands
    // =====================================================================

    pub fn console_sender(&self) -> Result<&ConsoleSender, ServerError> {
        self.ensure_not_stopped()?;
        Ok(&self.console)
    }

    /// Runs a command line on behalf of `sender`.
    ///
    /// The first whitespace-separated token names the command. Returns
    /// `Ok(false)` for a blank line or a command nobody registered.
    ///
    /// # Errors
    /// A handler failure is logged, reported to `sender`, and returned as
    /// [`ServerError::CommandExecution`]. It is never turned into `false`.
    pub fn dispatch_command(
        &self,
        sender: &dyn CommandSender,
        command_line: &str,
    ) -> Result<bool, ServerError> {
        self.ensure_running()?;
        let Some(line) = CommandLine::parse(command_line) else {
            return Ok(false);
        };

        match self.commands.execute(sender, line.name, &line.args) {
            Ok(handled) => {
                if !handled {
                    debug!(command = line.name, sender = sender.name(), "unknown command");
                }
                Ok(handled)
            }
            Err(source) => {
                error!(
                    command = line.name,
                    sender = sender.name(),
                    error = %source,
                    "command handler failed"
                );
                sender.send_message(COMMAND_FAILED_MESSAGE);
                Err(CommandExecutionFailure {
                    command: line.name.to_string(),
                    sender: sender.name().to_string(),
                    source,
                }
                .into())
            }
        }
    }

    // =====================================================================
    // Worlds
    // =====================================================================

    pub fn world(&self, name: &str) -> Result<Option<Rc<dyn World>>, ServerError> {
        self.ensure_running()?;
        Ok(self.worlds.world(name))
    }

    pub fn worlds(&self) -> Result<Vec<Rc<dyn World>>, ServerError> {
        self.ensure_running()?;
        Ok(self.worlds.worlds())
    }

    // =====================================================================
    // Reload and shutdown
    // =====================================================================

    /// Reloads the properties file (if one was configured), the access
    /// lists and the world configuration. Connected players stay
    /// connected.
    ///
    /// Everything is read before anything is applied, so a failure leaves
    /// the server exactly as it was. Idempotent.
    ///
    /// Inside a running [`ServerLoop`](crate::ServerLoop) use
    /// [`ServerHandle::request_reload`](crate::ServerHandle::request_reload),
    /// which does the same in two halves: [`ReloadedConfig::load`] on a
    /// worker task, then [`apply_reload`](Self::apply_reload) on the owner.
    pub async fn reload(&mut self) -> Result<(), ServerError> {
        self.ensure_running()?;
        let loaded = ReloadedConfig::load(&*self.store, self.properties_path.as_deref()).await?;
        self.apply_reload(loaded)
    }

    /// Applies configuration read by [`ReloadedConfig::load`]. Reloads the
    /// worlds first; if that fails nothing else is applied.
    pub fn apply_reload(&mut self, loaded: ReloadedConfig) -> Result<(), ServerError> {
        self.ensure_running()?;
        self.worlds.reload()?;

        if let Some(properties) = loaded.properties {
            self.access.whitelist().set_enabled(properties.white_list);
            self.properties = properties;
        }
        self.access.apply(loaded.access);
        info!(online = self.registry.len(), "server reloaded");
        Ok(())
    }

    pub(crate) fn properties_path(&self) -> Option<&Path> {
        self.properties_path.as_deref()
    }

    /// Disconnects every player, saves the access lists, and stops.
    ///
    /// Not cancellable in effect: the state leaves `Running` and every
    /// player is disconnected before the first await. Save failures are
    /// logged; they don't keep the server from stopping.
    pub async fn shutdown(&mut self) -> Result<(), ServerError> {
        self.ensure_running()?;
        self.transition(ServerState::ShuttingDown);
        info!(online = self.registry.len(), "server shutting down");

        for player in self.registry.live_view().snapshot() {
            player.kick(SHUTDOWN_MESSAGE);
            match self.registry.disconnect(player.identity()) {
                Ok(player) => self.offline.record_seen(player.identity()),
                Err(e) => warn!(error = %e, "player vanished during shutdown"),
            }
        }

        if let Err(e) = self.access.save_all(&*self.store).await {
            warn!(error = %e, "failed to save access lists during shutdown");
        }

        self.transition(ServerState::Stopped);
        info!("server stopped");
        Ok(())
    }

    // =====================================================================
    // Properties
    // =====================================================================

    pub fn properties(&self) -> Result<&ServerProperties, ServerError> {
        self.ensure_not_stopped()?;
        Ok(&self.properties)
    }

    pub(crate) fn tick_rate_hz(&self) -> u32 {
        self.properties.tick_rate_hz
    }

    /// Implementation name.
    pub fn name(&self) -> Result<&'static str, ServerError> {
        self.ensure_not_stopped()?;
        Ok("Lodestone")
    }

    pub fn version(&self) -> Result<&'static str, ServerError> {
        self.ensure_not_stopped()?;
        Ok(env!("CARGO_PKG_VERSION"))
    }

    pub fn server_name(&self) -> Result<&str, ServerError> {
        Ok(&self.properties()?.server_name)
    }

    pub fn motd(&self) -> Result<&str, ServerError> {
        Ok(&self.properties()?.motd)
    }

    pub fn ip(&self) -> Result<&str, ServerError> {
        Ok(&self.properties()?.ip)
    }

    pub fn port(&self) -> Result<u16, ServerError> {
        Ok(self.properties()?.port)
    }

    pub fn max_players(&self) -> Result<usize, ServerError> {
        Ok(self.properties()?.max_players)
    }

    pub fn view_distance(&self) -> Result<u8, ServerError> {
        Ok(self.properties()?.view_distance)
    }

    pub fn world_type(&self) -> Result<&str, ServerError> {
        Ok(&self.properties()?.world_type)
    }

    pub fn generate_structures(&self) -> Result<bool, ServerError> {
        Ok(self.properties()?.generate_structures)
    }

    pub fn online_mode(&self) -> Result<bool, ServerError> {
        Ok(self.properties()?.online_mode)
    }

    pub fn allow_flight(&self) -> Result<bool, ServerError> {
        Ok(self.properties()?.allow_flight)
    }

    pub fn is_hardcore(&self) -> Result<bool, ServerError> {
        Ok(self.properties()?.hardcore)
    }

    pub fn spawn_radius(&self) -> Result<u32, ServerError> {
        Ok(self.properties()?.spawn_radius)
    }

    pub fn set_spawn_radius(&mut self, radius: u32) -> Result<(), ServerError> {
        self.ensure_not_stopped()?;
        self.properties.spawn_radius = radius;
        Ok(())
    }

    /// The idle timeout, or `None` when disabled.
    pub fn idle_timeout(&self) -> Result<Option<Duration>, ServerError> {
        Ok(match self.properties()?.idle_timeout_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(u64::from(minutes) * 60)),
        })
    }

    /// Sets the idle timeout in minutes. 0 disables idle kicks.
    pub fn set_idle_timeout(&mut self, minutes: u32) -> Result<(), ServerError> {
        self.ensure_not_stopped()?;
        self.properties.idle_timeout_minutes = minutes;
        Ok(())
    }

    pub fn default_game_mode(&self) -> Result<GameMode, ServerError> {
        Ok(self.properties()?.default_game_mode)
    }

    pub fn set_default_game_mode(&mut self, mode: GameMode) -> Result<(), ServerError> {
        self.ensure_not_stopped()?;
        info!(%mode, "default game mode changed");
        self.properties.default_game_mode = mode;
        Ok(())
    }
}

impl<S: AccessStore> std::fmt::Debug for Server<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state)
            .field("server_name", &self.properties.server_name)
            .field("online", &self.registry.len())
            .finish_non_exhaustive()
    }
}
