//! Configuration loading.
//!
//! The bot reads one TOML file. Only the server host is mandatory;
//! everything else has a sensible default so a two-line config connects.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Failure to load or parse the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server to connect to.
    pub server: ServerConfig,
    /// Who the bot is on the network.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Channels joined automatically once registration completes.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Rejoin a channel after being kicked from it.
    #[serde(default)]
    pub rejoin_on_kick: bool,
    /// Reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Topic history tuning.
    #[serde(default)]
    pub topics: TopicsConfig,
}

/// Server endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Identity presented during registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Nickname.
    pub nick: String,
    /// Real name sent in the USER line.
    pub realname: String,
    /// Initial user mode bitmask.
    pub mode: u8,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig {
            nick: "minnow".to_owned(),
            realname: "minnow bot".to_owned(),
            mode: 0,
        }
    }
}

/// Bounded-retry reconnection policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Whether to reconnect at all after a lost connection.
    pub enabled: bool,
    /// How many reconnection attempts remain before giving up.
    pub retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            enabled: true,
            retries: 3,
        }
    }
}

/// Topic history tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Maximum undo/redo depth per channel.
    pub max_undo: usize,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        TopicsConfig { max_undo: 10 }
    }
}

fn default_port() -> u16 {
    6667
}

impl Config {
    /// Load and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
