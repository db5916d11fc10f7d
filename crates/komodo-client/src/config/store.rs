//! Config store for loading and saving komodo.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::ClientConfig;
use super::paths::{config_path, default_config_dir};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_default_dir() -> anyhow::Result<Self> {
        Ok(Self::from_paths(default_config_dir()?))
    }

    pub fn from_paths(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_path(&config_dir),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// A missing file yields the default config.
    pub fn load(&self) -> anyhow::Result<ClientConfig> {
        if !self.config_path.exists() {
            return Ok(ClientConfig::default());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;
        toml::from_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })
    }

    /// Load the file, then apply environment overrides.
    pub fn load_with_env(&self) -> anyhow::Result<ClientConfig> {
        Ok(self.load()?.apply_env())
    }

    pub fn save(&self, config: &ClientConfig) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }

    /// Set a single key by name and save.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<ClientConfig> {
        let mut config = self.load()?;
        match key {
            "address" => config.address = value.to_string(),
            "api_key" => config.api_key = Some(value.to_string()),
            "api_secret" => config.api_secret = Some(value.to_string()),
            "jwt" => config.jwt = Some(value.to_string()),
            "timezone" => config.timezone = value.to_string(),
            "retry_timeout_ms" => {
                config.retry_timeout_ms = value
                    .parse()
                    .with_context(|| format!("Invalid retry_timeout_ms: {}", value))?
            }
            "poll_interval_ms" => {
                config.poll_interval_ms = value
                    .parse()
                    .with_context(|| format!("Invalid poll_interval_ms: {}", value))?
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        self.save(&config)?;
        Ok(config)
    }
}
