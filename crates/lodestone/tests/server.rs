//! Integration tests for the server facade.
//!
//! These drive a `Server` built on a `MemoryStore` the way the network and
//! command layers would: admit, connect, broadcast, dispatch, reload and
//! shut down.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use lodestone::prelude::*;
use lodestone::{COMMAND_FAILED_MESSAGE, IDLE_KICK_MESSAGE, SHUTDOWN_MESSAGE};
use lodestone_registry::RegistryError;
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Helpers
// =========================================================================

fn id(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(name)
}

async fn running(builder: lodestone::ServerBuilder<MemoryStore>) -> Server<MemoryStore> {
    let mut server = builder.build();
    server.start().await.expect("memory store should load");
    server
}

async fn default_server() -> Server<MemoryStore> {
    running(Server::builder(MemoryStore::new())).await
}

/// Connects `name` and returns the receiving end of its outbox.
fn join(server: &mut Server<MemoryStore>, name: &str) -> UnboundedReceiver<Outbound> {
    let (conn, rx) = ConnectionHandle::channel("10.0.0.1");
    server.connect(id(name), conn).expect("player should connect");
    rx
}

/// A world collaborator that counts its reloads.
#[derive(Default)]
struct CountingWorlds {
    inner: StaticWorlds,
    reloads: Rc<Cell<usize>>,
}

impl WorldLookup for CountingWorlds {
    fn world(&self, name: &str) -> Option<Rc<dyn World>> {
        self.inner.world(name)
    }

    fn worlds(&self) -> Vec<Rc<dyn World>> {
        self.inner.worlds()
    }

    fn reload(&mut self) -> Result<(), lodestone::WorldReloadError> {
        self.reloads.set(self.reloads.get() + 1);
        Ok(())
    }
}

fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

// =========================================================================
// Registry invariant
// =========================================================================

#[tokio::test]
async fn test_connect_same_identity_twice_returns_already_connected() {
    let mut server = default_server().await;
    let _rx = join(&mut server, "Steve");

    let result = server.connect(id("steve"), ConnectionHandle::channel("10.0.0.2").0);

    assert!(matches!(
        result,
        Err(ServerError::Registry(RegistryError::AlreadyConnected(_)))
    ));
    assert_eq!(server.online_count().unwrap(), 1);
}

#[tokio::test]
async fn test_by_exact_name_is_case_insensitive_and_exact() {
    let mut server = default_server().await;
    let _rx = join(&mut server, "Steve");

    let upper = server.by_exact_name("Steve").unwrap().unwrap();
    let lower = server.by_exact_name("steve").unwrap().unwrap();

    assert!(Rc::ptr_eq(&upper, &lower));
    assert!(server.by_exact_name("Stev").unwrap().is_none());
}

#[tokio::test]
async fn test_live_view_reflects_disconnect() {
    let mut server = default_server().await;
    let _a = join(&mut server, "A");
    let _b = join(&mut server, "B");
    let view = server.live_view().unwrap();

    server.disconnect(&id("A")).unwrap();

    let names: Vec<_> = view.iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["B".to_string()]);
}

#[tokio::test]
async fn test_disconnect_stamps_offline_record() {
    let mut server = default_server().await;
    let _rx = join(&mut server, "Steve");
    server.disconnect(&id("Steve")).unwrap();

    let record = server.offline_player("STEVE").unwrap();

    assert!(record.has_played_before());
    assert_eq!(record.identity.name(), "Steve");
}

#[tokio::test]
async fn test_offline_player_materializes_unknown_name() {
    let mut server = default_server().await;

    let record = server.offline_player("Notch").unwrap();

    assert!(!record.has_played_before());
    assert!(!server.is_banned(&record.identity).unwrap());
}

// =========================================================================
// Admission
// =========================================================================

#[tokio::test]
async fn test_can_connect_banned_and_not_whitelisted_reports_banned() {
    let store = MemoryStore::new();
    store.set_bans(vec![id("eve")]);
    let props = ServerProperties {
        white_list: true,
        ..Default::default()
    };
    let mut server = running(Server::builder(store).properties(props)).await;

    assert_eq!(
        server.can_connect(&id("eve"), "10.0.0.9").unwrap(),
        Admission::Denied(DenyReason::Banned)
    );
    let result = server.connect(id("eve"), ConnectionHandle::channel("10.0.0.9").0);
    assert!(matches!(
        result,
        Err(ServerError::Denied(DenyReason::Banned))
    ));
    assert_eq!(server.online_count().unwrap(), 0);
}

#[tokio::test]
async fn test_can_connect_ip_ban_denies_any_identity() {
    let server = default_server().await;
    server.ban_ip("192.168.1.50").unwrap();

    assert_eq!(
        server.can_connect(&id("Steve"), "192.168.1.50").unwrap(),
        Admission::Denied(DenyReason::IpBanned)
    );
}

#[tokio::test]
async fn test_can_connect_operator_bypasses_whitelist() {
    let props = ServerProperties {
        white_list: true,
        ..Default::default()
    };
    let server = running(Server::builder(MemoryStore::new()).properties(props)).await;
    server.op(id("Alex")).unwrap();

    assert!(server.can_connect(&id("alex"), "10.0.0.1").unwrap().is_admitted());
    assert_eq!(
        server.can_connect(&id("bob"), "10.0.0.1").unwrap(),
        Admission::Denied(DenyReason::NotWhitelisted)
    );
}

#[tokio::test]
async fn test_can_connect_at_capacity_reports_server_full() {
    let props = ServerProperties {
        max_players: 2,
        ..Default::default()
    };
    let mut server = running(Server::builder(MemoryStore::new()).properties(props)).await;
    let _a = join(&mut server, "A");
    let _b = join(&mut server, "B");

    assert_eq!(
        server.can_connect(&id("C"), "10.0.0.3").unwrap(),
        Admission::Denied(DenyReason::ServerFull)
    );
}

#[tokio::test]
async fn test_set_whitelist_toggles_enforcement() {
    let server = default_server().await;
    assert!(!server.has_whitelist().unwrap());
    assert!(server.can_connect(&id("bob"), "10.0.0.1").unwrap().is_admitted());

    server.set_whitelist(true).unwrap();
    server.whitelist_add(id("Steve")).unwrap();

    assert!(server.has_whitelist().unwrap());
    assert!(!server.can_connect(&id("bob"), "10.0.0.1").unwrap().is_admitted());
    assert!(server.can_connect(&id("steve"), "10.0.0.1").unwrap().is_admitted());
}

// =========================================================================
// Broadcast
// =========================================================================

#[tokio::test]
async fn test_broadcast_message_reaches_every_player() {
    let mut server = default_server().await;
    let mut rxs: Vec<_> = ["A", "B", "C"].iter().map(|n| join(&mut server, n)).collect();

    let count = server.broadcast_message("hi").unwrap();

    assert_eq!(count, 3);
    for rx in &mut rxs {
        assert!(matches!(drain(rx).as_slice(), [Outbound::Message(m)] if m == "hi"));
    }
}

#[tokio::test]
async fn test_broadcast_counts_only_permitted_players() {
    let perms = DefaultPermissions::new().grant(id("B"), "vip");
    let mut server = running(Server::builder(MemoryStore::new()).permissions(perms)).await;
    let mut a = join(&mut server, "A");
    let mut b = join(&mut server, "B");
    let _c = join(&mut server, "C");

    let count = server.broadcast("hi", "vip").unwrap();

    assert_eq!(count, 1);
    assert!(drain(&mut a).is_empty());
    assert_eq!(drain(&mut b).len(), 1);
}

#[tokio::test]
async fn test_broadcast_skips_players_whose_transport_closed() {
    let mut server = default_server().await;
    let _a = join(&mut server, "A");
    drop(join(&mut server, "B"));

    assert_eq!(server.broadcast_message("hi").unwrap(), 1);
}

// =========================================================================
// Command dispatch
// =========================================================================

#[tokio::test]
async fn test_dispatch_command_unknown_or_blank_returns_false() {
    let server = default_server().await;
    let console = *server.console_sender().unwrap();

    assert!(!server.dispatch_command(&console, "nonexistent arg").unwrap());
    assert!(!server.dispatch_command(&console, "   ").unwrap());
}

#[tokio::test]
async fn test_dispatch_command_passes_name_and_args_to_handler() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let commands = CommandMap::new().register("say", move |sender, args| {
        sink.borrow_mut()
            .push(format!("{}: {}", sender.name(), args.join(" ")));
        Ok(())
    });
    let server = running(Server::builder(MemoryStore::new()).commands(commands)).await;

    let handled = server
        .dispatch_command(server.console_sender().unwrap(), "say hello   world")
        .unwrap();

    assert!(handled);
    assert_eq!(*calls.borrow(), vec!["CONSOLE: hello world".to_string()]);
}

#[tokio::test]
async fn test_dispatch_command_handler_failure_is_propagated_and_reported() {
    let commands =
        CommandMap::new().register("boom", |_, _| Err(HandlerError::new("exploded")));
    let mut server = running(Server::builder(MemoryStore::new()).commands(commands)).await;
    let mut rx = join(&mut server, "Steve");
    let player = server.by_exact_name("Steve").unwrap().unwrap();

    let result = server.dispatch_command(&*player, "boom now");

    match result {
        Err(ServerError::CommandExecution(failure)) => {
            assert_eq!(failure.command, "boom");
            assert_eq!(failure.sender, "Steve");
            assert_eq!(failure.source.message(), "exploded");
        }
        other => panic!("expected CommandExecution, got {other:?}"),
    }
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [Outbound::Message(m)] if m == COMMAND_FAILED_MESSAGE
    ));
}

#[tokio::test]
async fn test_ban_resolved_by_name_denies_id_bearing_player() {
    let mut server = default_server().await;
    let eve = PlayerIdentity::with_id("eve", PersistentId::random());
    server
        .connect(eve.clone(), ConnectionHandle::channel("10.0.0.5").0)
        .unwrap();
    server.disconnect(&eve).unwrap();

    server.ban(id("eve")).unwrap();
    assert!(server.can_connect(&eve, "10.0.0.5").unwrap().is_admitted());

    let resolved = server.offline_player("EVE").unwrap().identity;
    server.ban(resolved).unwrap();

    assert_eq!(
        server.can_connect(&eve, "10.0.0.5").unwrap(),
        Admission::Denied(DenyReason::Banned)
    );
}

// =========================================================================
// Reload
// =========================================================================

#[tokio::test]
async fn test_reload_applies_new_lists_and_keeps_players() {
    let mut server = default_server().await;
    let _rx = join(&mut server, "Steve");
    let store = std::sync::Arc::clone(server.store().unwrap());

    store.set_bans(vec![id("eve")]);
    store.set_operators(vec![id("Steve")]);
    server.reload().await.unwrap();

    assert!(server.is_banned(&id("eve")).unwrap());
    assert!(server.is_op(&id("steve")).unwrap());
    assert!(server.by_exact_name("Steve").unwrap().unwrap().is_online());

    // Idempotent.
    server.reload().await.unwrap();
    assert_eq!(server.banned_players().unwrap(), vec![id("eve")]);
}

#[tokio::test]
async fn test_reload_failure_retains_previous_lists() {
    let store = MemoryStore::new();
    store.set_whitelist(vec![id("Steve")]);
    let mut server = running(Server::builder(store)).await;

    server.store().unwrap().set_unavailable(true);
    let result = server.reload().await;

    assert!(matches!(result, Err(ServerError::Reload(_))));
    assert_eq!(server.whitelisted_players().unwrap(), vec![id("Steve")]);
}

#[tokio::test]
async fn test_reload_rereads_properties_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.toml");
    tokio::fs::write(&path, "white-list = false\nmotd = \"old\"")
        .await
        .unwrap();
    let props = ServerProperties::load(&path).await.unwrap();
    let mut server = running(
        Server::builder(MemoryStore::new())
            .properties(props)
            .properties_path(&path),
    )
    .await;

    tokio::fs::write(&path, "white-list = true\nmotd = \"new\"")
        .await
        .unwrap();
    server.reload().await.unwrap();

    assert_eq!(server.motd().unwrap(), "new");
    assert!(server.has_whitelist().unwrap());
}

#[tokio::test]
async fn test_reload_whitelist_only_touches_whitelist() {
    let store = MemoryStore::new();
    let server = running(Server::builder(store)).await;
    server.ban(id("eve")).unwrap();

    server.store().unwrap().set_whitelist(vec![id("Steve"), id("Alex")]);
    let count = server.reload_whitelist().await.unwrap();

    assert_eq!(count, 2);
    assert!(server.is_banned(&id("eve")).unwrap());
}

// =========================================================================
// Kicks
// =========================================================================

#[tokio::test]
async fn test_kick_player_sends_reason_then_disconnects() {
    let mut server = default_server().await;
    let mut rx = join(&mut server, "Steve");

    let player = server.kick_player(&id("Steve"), "bye").unwrap();

    assert!(!player.is_online());
    assert!(matches!(drain(&mut rx).as_slice(), [Outbound::Kick(r)] if r == "bye"));
}

#[tokio::test(start_paused = true)]
async fn test_kick_idle_players_kicks_only_idle() {
    let mut server = default_server().await;
    server.set_idle_timeout(1).unwrap();
    let mut idle = join(&mut server, "Idle");
    let _active = join(&mut server, "Active");

    tokio::time::advance(Duration::from_secs(45)).await;
    server.by_exact_name("Active").unwrap().unwrap().touch();
    tokio::time::advance(Duration::from_secs(20)).await;

    let kicked = server.kick_idle_players().unwrap();

    assert_eq!(kicked, 1);
    assert!(server.by_exact_name("Idle").unwrap().is_none());
    assert!(server.by_exact_name("Active").unwrap().is_some());
    assert!(matches!(
        drain(&mut idle).as_slice(),
        [Outbound::Kick(r)] if r == IDLE_KICK_MESSAGE
    ));
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_disconnects_everyone_and_saves_lists() {
    let mut server = default_server().await;
    let mut a = join(&mut server, "A");
    let _b = join(&mut server, "B");
    let held = server.by_exact_name("A").unwrap().unwrap();
    let store = std::sync::Arc::clone(server.store().unwrap());
    server.ban(id("eve")).unwrap();

    server.shutdown().await.unwrap();

    assert_eq!(server.state(), ServerState::Stopped);
    assert!(!held.is_online());
    assert!(matches!(
        drain(&mut a).as_slice(),
        [Outbound::Kick(r)] if r == SHUTDOWN_MESSAGE
    ));
    assert_eq!(store.bans(), vec![id("eve")]);
}

#[tokio::test]
async fn test_after_shutdown_every_operation_returns_stopped() {
    let mut server = default_server().await;
    server.shutdown().await.unwrap();

    let connect = server.connect(id("Steve"), ConnectionHandle::channel("10.0.0.1").0);
    assert!(matches!(connect, Err(ServerError::Stopped)));
    assert!(matches!(server.broadcast_message("hi"), Err(ServerError::Stopped)));
    assert!(matches!(server.live_view(), Err(ServerError::Stopped)));
    assert!(matches!(server.reload().await, Err(ServerError::Stopped)));
    assert!(matches!(server.shutdown().await, Err(ServerError::Stopped)));
    assert!(matches!(server.port(), Err(ServerError::Stopped)));
    assert!(matches!(server.properties(), Err(ServerError::Stopped)));
    assert!(matches!(server.store(), Err(ServerError::Stopped)));
    assert!(matches!(server.console_sender(), Err(ServerError::Stopped)));
    assert!(matches!(server.set_spawn_radius(99), Err(ServerError::Stopped)));
    assert!(matches!(
        server.set_default_game_mode(GameMode::Creative),
        Err(ServerError::Stopped)
    ));
}

// =========================================================================
// Owner loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_server_loop_serves_handle_until_shutdown() {
    let store = MemoryStore::new();
    let server = Server::builder(store).build();
    let server_loop = ServerLoop::new(server);
    let handle = server_loop.handle();

    let driver = async move {
        let (conn, mut rx) = ConnectionHandle::channel("10.0.0.1");
        handle.connect(id("Steve"), conn).await.unwrap();
        assert_eq!(handle.broadcast_message("welcome").await.unwrap(), 1);

        handle.call(|server| server.ban(id("eve"))).await.unwrap().unwrap();
        let denied = handle
            .can_connect(id("eve"), "10.0.0.9".to_string())
            .await
            .unwrap();
        assert_eq!(denied, Admission::Denied(DenyReason::Banned));

        handle.request_shutdown().unwrap();
        rx
    };

    let (stopped, mut rx) = tokio::join!(server_loop.run(), driver);
    let stopped = stopped.unwrap();

    assert_eq!(stopped.state(), ServerState::Stopped);
    let received = drain(&mut rx);
    assert!(matches!(received.first(), Some(Outbound::Message(m)) if m == "welcome"));
    assert!(matches!(received.last(), Some(Outbound::Kick(r)) if r == SHUTDOWN_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn test_server_handle_request_reload_applies_off_thread_load() {
    let server = Server::builder(MemoryStore::new()).build();
    let server_loop = ServerLoop::new(server);
    let handle = server_loop.handle();
    let store = std::sync::Arc::clone(server_loop.server().store().unwrap());

    let driver = async move {
        store.set_bans(vec![id("eve")]);
        handle.request_reload().await.unwrap().unwrap();
        let banned = handle
            .call(|server| server.is_banned(&id("eve")))
            .await
            .unwrap()
            .unwrap();
        handle.request_shutdown().unwrap();
        banned
    };

    let (stopped, banned) = tokio::join!(server_loop.run(), driver);

    assert!(stopped.is_ok());
    assert!(banned);
}

#[tokio::test(start_paused = true)]
async fn test_server_handle_request_reload_reloads_worlds_and_properties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.toml");
    tokio::fs::write(&path, "motd = \"old\"").await.unwrap();
    let worlds = CountingWorlds::default();
    let reloads = Rc::clone(&worlds.reloads);
    let server = Server::builder(MemoryStore::new())
        .properties(ServerProperties::load(&path).await.unwrap())
        .properties_path(&path)
        .worlds(worlds)
        .build();
    let server_loop = ServerLoop::new(server);
    let handle = server_loop.handle();

    let driver = async move {
        tokio::fs::write(&path, "motd = \"new\"").await.unwrap();
        handle.request_reload().await.unwrap().unwrap();
        let motd = handle
            .call(|server| server.motd().map(str::to_string))
            .await
            .unwrap()
            .unwrap();
        handle.request_shutdown().unwrap();
        motd
    };

    let (stopped, motd) = tokio::join!(server_loop.run(), driver);

    assert!(stopped.is_ok());
    assert_eq!(motd, "new");
    assert_eq!(reloads.get(), 1);
}

#[tokio::test]
async fn test_server_handle_after_loop_finished_returns_stopped() {
    let server_loop = ServerLoop::new(Server::builder(MemoryStore::new()).build());
    let handle = server_loop.handle();
    handle.request_shutdown().unwrap();

    server_loop.run().await.unwrap();

    assert!(matches!(
        handle.broadcast_message("anyone?").await,
        Err(ServerError::Stopped)
    ));
}
