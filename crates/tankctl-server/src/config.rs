//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use tankctl_identity::PrincipalSpec;
use tankctl_types::AccessPolicy;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tank object settings.
    #[serde(default)]
    pub tank: TankConfig,

    /// Valve controller and cache refresh settings.
    #[serde(default)]
    pub control: ControlConfig,

    /// Roles required per operation.
    #[serde(default)]
    pub access: AccessPolicy,

    /// Registered principals.
    #[serde(default)]
    pub principals: Vec<PrincipalSpec>,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// How long a connection waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tankctl_control=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TankConfig {
    /// Browse name of the tank object.
    #[serde(default = "default_tank_name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// The valve opens once the fill level rises above this percentage.
    #[serde(default = "default_open_above")]
    pub valve_open_above_pct: f64,

    /// The valve closes once the fill level drops below this percentage.
    #[serde(default = "default_close_below")]
    pub valve_close_below_pct: f64,

    /// Seconds between background cache refreshes; 0 disables them.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    4840
}

fn default_db_path() -> String {
    "tank.sqlite3".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tank_name() -> String {
    "tankSystem1".to_string()
}

fn default_open_above() -> f64 {
    75.0
}

fn default_close_below() -> f64 {
    25.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            name: default_tank_name(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            valve_open_above_pct: default_open_above(),
            valve_close_below_pct: default_close_below(),
            refresh_interval_secs: 0,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the settings returned by [`load_config`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The file at the requested path was read.
    File,
    /// No path was given, or nothing exists at it.
    Defaults,
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Nothing is logged here, since the subscriber is configured from the
/// result; callers report the returned [`ConfigOrigin`] once logging is up.
///
/// Environment variable overrides:
/// - `TANKCTL_HOST` overrides `server.host`
/// - `TANKCTL_PORT` overrides `server.port`
/// - `TANKCTL_DB_PATH` overrides `database.path`
/// - `TANKCTL_LOG_LEVEL` overrides `logging.level`
/// - `TANKCTL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<(Config, ConfigOrigin), ConfigError> {
    let (mut config, origin) = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => (parse_config(&contents)?, ConfigOrigin::File),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Config::default(), ConfigOrigin::Defaults)
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => (Config::default(), ConfigOrigin::Defaults),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok((config, origin))
}

/// Parses configuration from TOML text without consulting the environment.
///
/// # Errors
///
/// Returns `ConfigError::Parse` on malformed TOML or unknown role names.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("TANKCTL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("TANKCTL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("TANKCTL_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("TANKCTL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("TANKCTL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
