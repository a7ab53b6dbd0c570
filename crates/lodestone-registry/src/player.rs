//! Connected-player types: the live half of a player.
//!
//! A [`ConnectedPlayer`] exists only while its connection does. It carries
//! the identity plus the session state the rest of the server reads:
//! - WHERE the player is (world name)
//! - HOW to reach them ([`ConnectionHandle`] with an outbound channel)
//! - WHEN they last did something (idle timer)

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lodestone_protocol::PlayerIdentity;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Counter for process-unique connection ids.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Opaque identifier for one network connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Something the server wants delivered to a player's client.
///
/// The transport layer owns the receiving end and turns these into
/// packets; the registry never touches sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A chat/system line.
    Message(String),
    /// The server is closing this connection, with a reason to show.
    Kick(String),
}

/// Channel sender for delivering outbound messages to one player.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;

/// The registry's handle on a connection: id, remote address, outbox.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    address: String,
    outbox: PlayerSender,
}

impl ConnectionHandle {
    /// Wraps an outbound sender handed over by the transport.
    pub fn new(address: impl Into<String>, outbox: PlayerSender) -> Self {
        Self {
            id: ConnectionId::next(),
            address: address.into(),
            outbox,
        }
    }

    /// Creates a handle together with the receiving end of its outbox.
    ///
    /// Convenient for transports that spawn a writer task per connection,
    /// and for tests that want to inspect what was sent.
    pub fn channel(
        address: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(address, tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

// ---------------------------------------------------------------------------
// ConnectedPlayer
// ---------------------------------------------------------------------------

/// A player with a live session.
///
/// Owned by the [`PlayerRegistry`](crate::PlayerRegistry); everyone else
/// receives `Rc<ConnectedPlayer>` handles. A handle that outlives the
/// session reports `is_online() == false` and silently drops messages,
/// so a stale handle can never reach a reconnected player's new session.
///
/// Mutable session state sits behind `Cell`/`RefCell` because it is only
/// ever touched from the owner thread (the type is `!Sync`).
#[derive(Debug)]
pub struct ConnectedPlayer {
    identity: PlayerIdentity,
    connection: ConnectionHandle,
    world: RefCell<Option<String>>,
    connected_at: Instant,
    last_active: Cell<Instant>,
    online: Cell<bool>,
}

impl ConnectedPlayer {
    pub(crate) fn new(identity: PlayerIdentity, connection: ConnectionHandle) -> Self {
        let now = Instant::now();
        Self {
            identity,
            connection,
            world: RefCell::new(None),
            connected_at: now,
            last_active: Cell::new(now),
            online: Cell::new(true),
        }
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// Remote address the player connected from.
    pub fn address(&self) -> &str {
        self.connection.address()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Name of the world the player is currently in, if placed in one.
    pub fn world(&self) -> Option<String> {
        self.world.borrow().clone()
    }

    /// Moves the player to another world (by name). World membership is
    /// tracked by the world collaborator; this is only the back-reference.
    pub fn set_world(&self, world: Option<String>) {
        *self.world.borrow_mut() = world;
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Resets the idle timer. Called by the input-handling collaborator
    /// whenever the player acts.
    pub fn touch(&self) {
        self.last_active.set(Instant::now());
    }

    /// How long since the player last acted.
    pub fn idle_for(&self) -> Duration {
        self.last_active.get().elapsed()
    }

    /// `false` once the registry has disconnected this session.
    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    /// Queues a chat line for this player.
    ///
    /// Returns `true` if the message was queued, `false` if the session is
    /// gone or the transport already closed its end.
    pub fn send_message(&self, text: &str) -> bool {
        self.is_online()
            && self
                .connection
                .outbox
                .send(Outbound::Message(text.to_string()))
                .is_ok()
    }

    /// Tells the client it is being disconnected. Removing the session
    /// from the registry is the caller's job.
    pub fn kick(&self, reason: &str) -> bool {
        self.is_online()
            && self
                .connection
                .outbox
                .send(Outbound::Kick(reason.to_string()))
                .is_ok()
    }

    pub(crate) fn mark_offline(&self) {
        self.online.set(false);
    }
}
