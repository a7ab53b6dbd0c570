//! Command senders and the command-execution collaborator.
//!
//! The server only splits a command line into a name and arguments and
//! hands it to a [`CommandExecutor`]. What commands exist and what they do
//! is the executor's business.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use lodestone_protocol::PlayerIdentity;
use lodestone_registry::ConnectedPlayer;

// ---------------------------------------------------------------------------
// Senders
// ---------------------------------------------------------------------------

/// Whoever issued a command: a player or the console.
pub trait CommandSender {
    fn name(&self) -> &str;

    /// The player identity behind this sender. `None` for the console.
    fn identity(&self) -> Option<&PlayerIdentity>;

    fn send_message(&self, text: &str);
}

impl CommandSender for ConnectedPlayer {
    fn name(&self) -> &str {
        ConnectedPlayer::name(self)
    }

    fn identity(&self) -> Option<&PlayerIdentity> {
        Some(ConnectedPlayer::identity(self))
    }

    fn send_message(&self, text: &str) {
        ConnectedPlayer::send_message(self, text);
    }
}

/// The server console. Its replies go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "CONSOLE"
    }

    fn identity(&self) -> Option<&PlayerIdentity> {
        None
    }

    fn send_message(&self, text: &str) {
        tracing::info!(target: "lodestone::console", "{text}");
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A command handler failed unexpectedly.
///
/// "Unknown command" is not a failure (the executor returns `Ok(false)`);
/// this is for handlers that started and broke.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A handler failure, tagged with the command and sender it came from.
#[derive(Debug, thiserror::Error)]
#[error("command '{command}' issued by {sender} failed: {source}")]
pub struct CommandExecutionFailure {
    pub command: String,
    pub sender: String,
    #[source]
    pub source: HandlerError,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A command line split into name and arguments on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> CommandLine<'a> {
    /// `None` for a blank line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        Some(Self {
            name,
            args: tokens.collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs commands for the server.
pub trait CommandExecutor {
    /// Runs `name` with `args`.
    ///
    /// Returns `Ok(false)` when no handler is registered under `name`.
    fn execute(
        &self,
        sender: &dyn CommandSender,
        name: &str,
        args: &[&str],
    ) -> Result<bool, HandlerError>;
}

type Handler = Box<dyn Fn(&dyn CommandSender, &[&str]) -> Result<(), HandlerError>>;

/// A name → handler table. Names match case-insensitively.
#[derive(Default)]
pub struct CommandMap {
    handlers: HashMap<String, Handler>,
}

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn register<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&dyn CommandSender, &[&str]) -> Result<(), HandlerError> + 'static,
    {
        self.handlers
            .insert(name.to_ascii_lowercase(), Box::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_ascii_lowercase())
    }
}

impl fmt::Debug for CommandMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMap")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandExecutor for CommandMap {
    fn execute(
        &self,
        sender: &dyn CommandSender,
        name: &str,
        args: &[&str],
    ) -> Result<bool, HandlerError> {
        let Some(handler) = self.handlers.get(&name.to_ascii_lowercase()) else {
            return Ok(false);
        };
        handler(sender, args)?;
        Ok(true)
    }
}
