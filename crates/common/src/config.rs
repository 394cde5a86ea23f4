//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Relay tuning knobs.
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
///
/// The store is a single `SQLite` file in the working directory by default.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// What to do with a frame when a session's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard the frame; the delivery is reported as failed.
    #[default]
    Drop,
    /// Discard the frame and evict the slow session.
    Disconnect,
}

/// Relay tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Capacity of each session's outbound frame queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Policy applied when an outbound queue overflows.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Group messages replayed per group on session join.
    #[serde(default = "default_sync_messages")]
    pub sync_messages: u64,
    /// Group messages returned by an explicit history fetch.
    #[serde(default = "default_fetch_messages")]
    pub fetch_messages: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_queue: default_outbound_queue(),
            overflow_policy: OverflowPolicy::default(),
            sync_messages: default_sync_messages(),
            fetch_messages: default_fetch_messages(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://./peerlink.db?mode=rwc".to_string()
}

const fn default_max_connections() -> u32 {
    32
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_outbound_queue() -> usize {
    256
}

const fn default_sync_messages() -> u64 {
    50
}

const fn default_fetch_messages() -> u64 {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PEERLINK_ENV`)
    /// 3. Environment variables with `PEERLINK` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PEERLINK_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PEERLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PEERLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
