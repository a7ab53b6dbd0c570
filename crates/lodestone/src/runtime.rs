//! The owner loop and the handle other tasks use to reach it.
//!
//! [`ServerLoop`] owns the [`Server`] and drives it from one task: each
//! tick it applies queued mutations, then kicks idle players. Network
//! readers, file watchers and anything else running elsewhere get a
//! [`ServerHandle`] and submit work through it.
//!
//! ```text
//! network task ──┐
//! file watcher ──┼── ServerHandle ──→ mutation queue ──→ ServerLoop (owner)
//! console task ──┘                                          │
//!                                                           └─ Server, LiveView
//! ```
//!
//! `Server` is `!Send`, so `ServerLoop::run` must be awaited on the task
//! that built it (e.g. inside `#[tokio::main(flavor = "current_thread")]`
//! or a `LocalSet`). `ServerHandle` is `Send + Clone`.

use std::path::PathBuf;
use std::sync::Arc;

use lodestone_access::{AccessStore, Admission};
use lodestone_protocol::PlayerIdentity;
use lodestone_registry::{ConnectionHandle, ConnectionId};
use lodestone_tick::{MutationQueue, MutationSender, TickConfig, TickScheduler, mutation_queue};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{ReloadedConfig, Server, ServerError, ServerState};

// ---------------------------------------------------------------------------
// ServerLoop
// ---------------------------------------------------------------------------

/// Runs a [`Server`] on the current task until shutdown is requested.
pub struct ServerLoop<S: AccessStore> {
    server: Server<S>,
    scheduler: TickScheduler,
    queue: MutationQueue<Server<S>>,
    mutations: MutationSender<Server<S>>,
}

impl<S: AccessStore> ServerLoop<S> {
    /// Ticks at the server's configured `tick-rate-hz`.
    pub fn new(server: Server<S>) -> Self {
        let config = TickConfig::with_rate(server.tick_rate_hz());
        Self::with_tick_config(server, config)
    }

    pub fn with_tick_config(server: Server<S>, config: TickConfig) -> Self {
        let (mutations, queue) = mutation_queue();
        Self {
            server,
            scheduler: TickScheduler::new(config),
            queue,
            mutations,
        }
    }

    /// A handle for other tasks. Valid until the loop finishes.
    pub fn handle(&self) -> ServerHandle<S> {
        ServerHandle {
            mutations: self.mutations.clone(),
            store: Arc::clone(self.server.shared_store()),
            properties_path: self.server.properties_path().map(PathBuf::from),
        }
    }

    pub fn server(&self) -> &Server<S> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut Server<S> {
        &mut self.server
    }

    /// Starts the server if needed, runs until a shutdown request, then
    /// shuts the server down and returns it (in `Stopped`).
    ///
    /// In event-driven mode (rate 0) the loop wakes only for queued work
    /// and idle players are never kicked.
    pub async fn run(mut self) -> Result<Server<S>, ServerError> {
        if self.server.state() == ServerState::Starting {
            self.server.start().await?;
        }
        info!(
            rate_hz = self.scheduler.tick_rate_hz(),
            "owner loop running"
        );

        if self.scheduler.is_event_driven() {
            self.run_event_driven().await;
        } else {
            self.run_ticking().await;
        }

        info!(ticks = self.scheduler.tick_count(), "owner loop finished");
        self.server.shutdown().await?;
        Ok(self.server)
    }

    async fn run_ticking(&mut self) {
        loop {
            self.scheduler.wait_for_tick().await;
            let outcome = self.queue.drain(&mut self.server);
            if outcome.shutdown_requested {
                return;
            }
            if let Err(e) = self.server.kick_idle_players() {
                warn!(error = %e, "idle sweep failed");
            }
            self.scheduler.record_tick_end();
        }
    }

    async fn run_event_driven(&mut self) {
        // The loop holds a sender itself, so `recv` only ends on shutdown.
        while let Some(pending) = self.queue.recv().await {
            if MutationQueue::apply(&mut self.server, pending) {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ServerHandle
// ---------------------------------------------------------------------------

/// The narrow, thread-safe capability handed to collaborators instead of a
/// global server instance.
///
/// Every method queues work for the owner loop. Once the loop has
/// finished, they fail with [`ServerError::Stopped`].
pub struct ServerHandle<S: AccessStore> {
    mutations: MutationSender<Server<S>>,
    store: Arc<S>,
    properties_path: Option<PathBuf>,
}

impl<S: AccessStore> Clone for ServerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            mutations: self.mutations.clone(),
            store: Arc::clone(&self.store),
            properties_path: self.properties_path.clone(),
        }
    }
}

impl<S: AccessStore> std::fmt::Debug for ServerHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("closed", &self.mutations.is_closed())
            .finish()
    }
}

impl<S: AccessStore> ServerHandle<S> {
    /// Queues `f` to run against the server on the owner thread.
    pub fn submit<F>(&self, f: F) -> Result<(), ServerError>
    where
        F: FnOnce(&mut Server<S>) + Send + 'static,
    {
        Ok(self.mutations.submit(f)?)
    }

    /// Runs `f` on the owner thread and waits for its result.
    pub async fn call<F, R>(&self, f: F) -> Result<R, ServerError>
    where
        F: FnOnce(&mut Server<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(move |server| {
            let _ = reply_tx.send(f(server));
        })?;
        reply_rx.await.map_err(|_| ServerError::Stopped)
    }

    pub async fn can_connect(
        &self,
        identity: PlayerIdentity,
        address: String,
    ) -> Result<Admission, ServerError> {
        self.call(move |server| server.can_connect(&identity, &address))
            .await?
    }

    /// Admits and registers a player; returns the session's connection id.
    pub async fn connect(
        &self,
        identity: PlayerIdentity,
        connection: ConnectionHandle,
    ) -> Result<ConnectionId, ServerError> {
        self.call(move |server| {
            server
                .connect(identity, connection)
                .map(|player| player.connection_id())
        })
        .await?
    }

    pub async fn disconnect(&self, identity: PlayerIdentity) -> Result<(), ServerError> {
        self.call(move |server| server.disconnect(&identity).map(|_| ()))
            .await?
    }

    pub async fn broadcast_message(&self, text: impl Into<String>) -> Result<usize, ServerError> {
        let text = text.into();
        self.call(move |server| server.broadcast_message(&text))
            .await?
    }

    /// The full [`Server::reload`] without stalling the owner: the
    /// properties file and the access lists are read on a spawned task,
    /// then worlds are reloaded and everything is swapped in as a queued
    /// mutation.
    pub fn request_reload(&self) -> JoinHandle<Result<(), ServerError>> {
        let handle = self.clone();
        tokio::spawn(async move {
            let loaded =
                ReloadedConfig::load(&*handle.store, handle.properties_path.as_deref()).await?;
            handle
                .call(move |server| server.apply_reload(loaded))
                .await?
        })
    }

    /// Asks the owner loop to stop. Work queued before this still runs.
    pub fn request_shutdown(&self) -> Result<(), ServerError> {
        Ok(self.mutations.request_shutdown()?)
    }
}
