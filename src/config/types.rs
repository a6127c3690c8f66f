//! Configuration types and structures.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3030;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on (default: 3030).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tasktree/tasks.db")
}

/// Login session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session lifetime in hours (default: 24).
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_cookie_name() -> String {
    "tasktree_sid".to_string()
}

fn default_ttl_hours() -> u32 {
    24
}

impl SessionConfig {
    pub fn ttl_secs(&self) -> i64 {
        i64::from(self.ttl_hours) * 3600
    }
}

impl Config {
    /// Load a single YAML file, filling unspecified fields with defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Socket address the server binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        raw.parse()
            .with_context(|| format!("invalid listen address {}", raw))
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
