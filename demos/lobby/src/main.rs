//! A lobby server with no network layer: two bot players join at startup
//! and the console drives everything else.
//!
//! ```text
//! cargo run -p lobby -- [server.toml] [data-dir]
//! RUST_LOG=debug cargo run -p lobby
//! ```
//!
//! Console commands: `list`, `say <text>`, `kick <name>`, `ban <name>`,
//! `pardon <name>`, `op <name>`, `whitelist on|off|add <name>`,
//! `gamemode <mode>`, `reload`, `stop`. Anything else goes through the server's command dispatcher
//! (`help`, `me <text>`).

use std::path::PathBuf;

use lodestone::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Handle = ServerHandle<JsonFileStore>;

// ---------------------------------------------------------------------------
// Commands dispatched through the server
// ---------------------------------------------------------------------------

fn commands() -> CommandMap {
    CommandMap::new()
        .register("help", |sender, _| {
            sender.send_message(
                "list | say | kick | ban | pardon | op | whitelist | gamemode | reload | stop | me",
            );
            Ok(())
        })
        .register("me", |sender, args| {
            if args.is_empty() {
                return Err(HandlerError::new("usage: me <action>"));
            }
            sender.send_message(&format!("* {} {}", sender.name(), args.join(" ")));
            Ok(())
        })
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

/// Connects a bot player and logs whatever the server sends it.
async fn spawn_bot(handle: &Handle, name: &'static str, address: &'static str) {
    let (conn, mut outbox) = ConnectionHandle::channel(address);
    match handle.connect(PlayerIdentity::new(name), conn).await {
        Ok(connection) => info!(bot = name, %connection, "bot joined"),
        Err(e) => {
            warn!(bot = name, error = %e, "bot was refused");
            return;
        }
    }
    tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            match msg {
                Outbound::Message(text) => info!(bot = name, %text, "bot received"),
                Outbound::Kick(reason) => {
                    info!(bot = name, %reason, "bot kicked");
                    break;
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// The identity a console name refers to: whoever last used the name on
/// this server (with their persistent id), or a name-only placeholder for
/// someone who never joined.
fn resolve(server: &mut Server<JsonFileStore>, name: &str) -> Result<PlayerIdentity, ServerError> {
    Ok(server.offline_player(name)?.identity)
}

/// Runs one console line. Returns `false` once the server is gone.
async fn console_line(handle: &Handle, line: String) -> bool {
    let (command, arg, target) = {
        let mut words = line.split_whitespace().map(str::to_string);
        (words.next(), words.next(), words.next())
    };
    let Some(command) = command else {
        return true;
    };

    let result = match (command.as_str(), arg) {
        ("stop", _) => return handle.request_shutdown().is_err(),
        ("reload", _) => match handle.request_reload().await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "reload task failed");
                Ok(())
            }
        },
        ("list", _) => handle
            .call(|server| -> Result<(), ServerError> {
                let view = server.live_view()?;
                let names: Vec<String> = view.iter().map(|p| p.name().to_string()).collect();
                info!(online = names.len(), players = ?names, "player list");
                Ok(())
            })
            .await
            .and_then(|r| r),
        ("say", _) => {
            let text = line.trim_start()[command.len()..].trim().to_string();
            handle
                .broadcast_message(text)
                .await
                .map(|count| info!(count, "broadcast sent"))
        }
        ("kick", Some(name)) => handle
            .call(move |server| -> Result<(), ServerError> {
                let who = resolve(server, &name)?;
                server.kick_player(&who, "Kicked by an operator")?;
                Ok(())
            })
            .await
            .and_then(|r| r),
        ("ban", Some(name)) => handle
            .call(move |server| -> Result<(), ServerError> {
                let who = resolve(server, &name)?;
                server.ban(who.clone())?;
                if server.by_exact_name(who.name())?.is_some() {
                    server.kick_player(&who, "You are banned from this server.")?;
                }
                Ok(())
            })
            .await
            .and_then(|r| r),
        ("pardon", Some(name)) => handle
            .call(move |server| -> Result<(), ServerError> {
                let who = resolve(server, &name)?;
                server.pardon(&who).map(|_| ())
            })
            .await
            .and_then(|r| r),
        ("op", Some(name)) => handle
            .call(move |server| -> Result<(), ServerError> {
                let who = resolve(server, &name)?;
                server.op(who).map(|_| ())
            })
            .await
            .and_then(|r| r),
        ("whitelist", Some(mode)) => handle
            .call(move |server| -> Result<(), ServerError> {
                match (mode.as_str(), target) {
                    ("on", _) => server.set_whitelist(true),
                    ("off", _) => server.set_whitelist(false),
                    ("add", Some(name)) => {
                        let who = resolve(server, &name)?;
                        server.whitelist_add(who).map(|_| ())
                    }
                    _ => {
                        server
                            .console_sender()?
                            .send_message("usage: whitelist on|off|add <name>");
                        Ok(())
                    }
                }
            })
            .await
            .and_then(|r| r),
        ("gamemode", Some(mode)) => handle
            .call(move |server| -> Result<(), ServerError> {
                match mode.parse::<GameMode>() {
                    Ok(mode) => server.set_default_game_mode(mode),
                    Err(e) => {
                        server.console_sender()?.send_message(&e.to_string());
                        Ok(())
                    }
                }
            })
            .await
            .and_then(|r| r),
        _ => handle
            .call(move |server| -> Result<(), ServerError> {
                let console = *server.console_sender()?;
                if !server.dispatch_command(&console, &line)? {
                    console.send_message("Unknown command. Type \"help\" for help.");
                }
                Ok(())
            })
            .await
            .and_then(|r| r),
    };

    match result {
        Ok(()) => true,
        Err(ServerError::Stopped) => false,
        Err(e) => {
            warn!(error = %e, "console command failed");
            true
        }
    }
}

async fn run_console(handle: Handle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !console_line(&handle, line).await {
                    break;
                }
            }
            // stdin closed: treat it like `stop`.
            Ok(None) | Err(_) => {
                let _ = handle.request_shutdown();
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let properties_path = PathBuf::from(args.next().unwrap_or_else(|| "server.toml".into()));
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".into()));

    let properties = if tokio::fs::try_exists(&properties_path).await? {
        ServerProperties::load(&properties_path).await?
    } else {
        info!(path = %properties_path.display(), "no properties file, using defaults");
        ServerProperties::default()
    };

    let mut builder = Server::builder(JsonFileStore::new(&data_dir))
        .properties(properties)
        .worlds(StaticWorlds::named(["lobby", "arena"]))
        .commands(commands());
    if tokio::fs::try_exists(&properties_path).await? {
        builder = builder.properties_path(&properties_path);
    }
    let mut server = builder.build();
    server.start().await?;
    info!(
        name = server.name()?,
        version = server.version()?,
        data = %data_dir.display(),
        "lobby ready, type \"help\" for commands"
    );

    let server_loop = ServerLoop::new(server);
    let handle = server_loop.handle();

    let bots = handle.clone();
    tokio::spawn(async move {
        spawn_bot(&bots, "Steve", "10.0.0.2").await;
        spawn_bot(&bots, "Alex", "10.0.0.3").await;
    });
    tokio::spawn(run_console(handle));

    let stopped = server_loop.run().await?;
    info!(state = %stopped.state(), "bye");
    Ok(())
}
