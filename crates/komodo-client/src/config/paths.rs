//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "komodo.toml";

/// `<config_dir>/komodo`, eg. `~/.config/komodo` on Linux.
pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("komodo"))
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}
