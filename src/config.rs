//! Configuration loading from an optional TOML file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Local libSQL file, or the replica file when `url` is set.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Remote Turso database to replicate from.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "basics_server=debug,info".
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "example.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
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
            url: None,
            auth_token: None,
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

impl DatabaseConfig {
    /// Both halves of the Turso credentials, when configured.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (self.url.as_deref(), self.auth_token.as_deref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some((url, token)),
            _ => None,
        }
    }
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist, then applies environment overrides:
///
/// - `BASICS_HOST`, `BASICS_PORT`
/// - `BASICS_DB_PATH`, `TURSO_DATABASE_URL`, `TURSO_AUTH_TOKEN`
/// - `BASICS_LOG_LEVEL`, `BASICS_LOG_JSON` ("true" or "1")
///
/// A host or port that does not parse is an error rather than a silent
/// fallback to the default.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let config = read_config_file(path)?;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

fn read_config_file(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path, "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("BASICS_HOST") {
        config.server.host = host.parse().map_err(|_| Error::InvalidEnv {
            key: "BASICS_HOST",
            value: host,
        })?;
    }
    if let Some(port) = lookup("BASICS_PORT") {
        config.server.port = port.parse().map_err(|_| Error::InvalidEnv {
            key: "BASICS_PORT",
            value: port,
        })?;
    }
    if let Some(path) = lookup("BASICS_DB_PATH") {
        config.database.path = path;
    }
    if let Some(url) = lookup("TURSO_DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Some(token) = lookup("TURSO_AUTH_TOKEN") {
        config.database.auth_token = Some(token);
    }
    if let Some(level) = lookup("BASICS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("BASICS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    Ok(config)
}
