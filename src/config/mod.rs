//! Layered configuration.
//!
//! Configuration is assembled from tiers with field-by-field YAML merging:
//! 1. **Defaults** - `Config::default()`
//! 2. **Project** - `$CWD/tasktree/config.yaml`
//! 3. **User** - `~/.tasktree/config.yaml`
//! 4. **Environment** - variables below
//!
//! CLI flags are applied last, by the binary.
//!
//! ## Environment Variables
//! - `TASKTREE_CONFIG_PATH` - Explicit config file (skips tier merging)
//! - `TASKTREE_DB_PATH` - Database path
//! - `TASKTREE_HOST` - Listen address
//! - `TASKTREE_PORT` - Listen port
//! - `TASKTREE_USER_DIR` - User config dir (default: `~/.tasktree`)
//! - `TASKTREE_PROJECT_DIR` - Project config dir (default: `./tasktree`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
