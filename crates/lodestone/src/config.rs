//! Server properties.
//!
//! Loaded from a TOML file whose keys mirror the classic
//! `server.properties` names:
//!
//! ```toml
//! server-name = "Lodestone Lobby"
//! max-players = 40
//! white-list = true
//! default-game-mode = "adventure"
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] value.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors reading or writing a properties file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read properties: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid properties: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize properties: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ---------------------------------------------------------------------------
// GameMode
// ---------------------------------------------------------------------------

/// The mode new players start in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Survival => write!(f, "survival"),
            Self::Creative => write!(f, "creative"),
            Self::Adventure => write!(f, "adventure"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game mode: {0}")]
pub struct UnknownGameMode(pub String);

impl FromStr for GameMode {
    type Err = UnknownGameMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "survival" | "0" => Ok(Self::Survival),
            "creative" | "1" => Ok(Self::Creative),
            "adventure" | "2" => Ok(Self::Adventure),
            "spectator" | "3" => Ok(Self::Spectator),
            _ => Err(UnknownGameMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerProperties
// ---------------------------------------------------------------------------

/// Static server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerProperties {
    /// Name shown in server lists.
    pub server_name: String,
    /// Message of the day.
    pub motd: String,
    /// Bind address. Empty means all interfaces.
    pub ip: String,
    pub port: u16,
    /// Admission cap. Players beyond it are denied with `ServerFull`.
    pub max_players: usize,
    /// Chunk radius sent to clients (2–32).
    pub view_distance: u8,
    pub world_type: String,
    pub generate_structures: bool,
    pub online_mode: bool,
    pub allow_flight: bool,
    pub hardcore: bool,
    /// Whether the whitelist is enforced at admission.
    pub white_list: bool,
    /// Radius around spawn that only operators may build in.
    pub spawn_radius: u32,
    /// Minutes before an idle player is kicked. 0 disables.
    pub idle_timeout_minutes: u32,
    pub default_game_mode: GameMode,
    /// Owner loop rate. 0 runs the loop event-driven.
    pub tick_rate_hz: u32,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            server_name: "Lodestone Server".to_string(),
            motd: "A Lodestone Server".to_string(),
            ip: String::new(),
            port: 25565,
            max_players: 20,
            view_distance: 10,
            world_type: "default".to_string(),
            generate_structures: true,
            online_mode: true,
            allow_flight: false,
            hardcore: false,
            white_list: false,
            spawn_radius: 16,
            idle_timeout_minutes: 0,
            default_game_mode: GameMode::Survival,
            tick_rate_hz: 20,
        }
    }
}

impl ServerProperties {
    pub const MIN_VIEW_DISTANCE: u8 = 2;
    pub const MAX_VIEW_DISTANCE: u8 = 32;
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Parses a TOML document and clamps it with [`validated`](Self::validated).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let properties: Self = toml::from_str(text)?;
        Ok(properties.validated())
    }

    /// Reads and parses a TOML properties file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Clamps out-of-range values, logging each fix.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .view_distance
            .clamp(Self::MIN_VIEW_DISTANCE, Self::MAX_VIEW_DISTANCE);
        if clamped != self.view_distance {
            warn!(
                view_distance = self.view_distance,
                clamped, "view-distance out of range, clamping"
            );
            self.view_distance = clamped;
        }
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick-rate-hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        if self.server_name.trim().is_empty() {
            warn!("server-name is blank, using default");
            self.server_name = Self::default().server_name;
        }
        self
    }
}
