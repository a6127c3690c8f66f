//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    Project = 1,
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration directories from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TASKTREE_USER_DIR or ~/.tasktree
        let user_dir = std::env::var("TASKTREE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".tasktree")));

        // Project dir: TASKTREE_PROJECT_DIR or $CWD/tasktree
        let project_dir = std::env::var("TASKTREE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("tasktree")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Read a tier's YAML file as a JSON value for merging.
///
/// A missing file is skipped silently; an unreadable or malformed one is
/// skipped with a warning.
fn read_tier(dir: &Path, tier: ConfigTier) -> Option<(Value, PathBuf)> {
    let file = dir.join("config.yaml");
    if !file.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(&file)
        .map_err(anyhow::Error::from)
        .and_then(|content| serde_yaml::from_str::<Value>(&content).map_err(Into::into));
    match parsed {
        Ok(value) => Some((value, file)),
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

/// Loads and merges configuration tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Explicit config path bypasses tier merging
        if let Ok(explicit_path) = std::env::var("TASKTREE_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)?;
            Self::apply_env_overrides(&mut config)?;
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for (dir, tier) in [
            (paths.project_dir.as_deref(), ConfigTier::Project),
            (paths.user_dir.as_deref(), ConfigTier::User),
        ] {
            if let Some((value, file)) = dir.and_then(|d| read_tier(d, tier)) {
                tiers.push(value);
                config_path = Some(file);
            }
        }

        let merged = deep_merge_all(tiers);
        let mut config: Config =
            serde_json::from_value(merged).context("merged configuration is invalid")?;

        Self::apply_env_overrides(&mut config)?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) -> Result<()> {
        if let Ok(db_path) = std::env::var("TASKTREE_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(host) = std::env::var("TASKTREE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("TASKTREE_PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("TASKTREE_PORT is not a port number: {}", port))?;
        }

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
