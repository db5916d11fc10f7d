//! Client configuration.
//!
//! Settings come from `komodo.toml` in the user config directory and can be
//! overridden by `KOMODO_*` environment variables.

pub mod paths;
pub mod store;

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::client::Credentials;

pub use store::ConfigStore;

pub const ENV_ADDRESS: &str = "KOMODO_ADDRESS";
pub const ENV_API_KEY: &str = "KOMODO_API_KEY";
pub const ENV_API_SECRET: &str = "KOMODO_API_SECRET";
pub const ENV_JWT: &str = "KOMODO_JWT";

pub const DEFAULT_RETRY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Core address, eg. `https://komodo.example.com`.
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Used instead of api keys when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    /// Delay before reconnecting the update websocket.
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
    /// Interval between polls while waiting on an update.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timezone for maintenance windows that do not set one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,
}

fn default_retry_timeout_ms() -> u64 {
    DEFAULT_RETRY_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            api_key: None,
            api_secret: None,
            jwt: None,
            retry_timeout_ms: DEFAULT_RETRY_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timezone: String::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_api_keys(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.api_secret = Some(secret.into());
        self
    }

    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    /// Apply `KOMODO_*` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(address) = get(ENV_ADDRESS) {
            self.address = address;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(secret) = get(ENV_API_SECRET) {
            self.api_secret = Some(secret);
        }
        if let Some(jwt) = get(ENV_JWT) {
            self.jwt = Some(jwt);
        }
        self
    }

    /// Check the address parses as an http(s) url.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.address.trim().is_empty() {
            anyhow::bail!(
                "No Komodo address configured. Set {} or run `km config set address <url>`",
                ENV_ADDRESS
            );
        }
        let url = url::Url::parse(&self.address)
            .with_context(|| format!("Invalid Komodo address: {}", self.address))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Komodo address must use http or https, got '{}'",
                url.scheme()
            );
        }
        Ok(())
    }

    /// Jwt wins over api keys. A key without a secret (or the reverse) is an error.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        if let Some(jwt) = self.jwt.as_ref().filter(|j| !j.is_empty()) {
            return Ok(Credentials::Jwt(jwt.clone()));
        }
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Ok(Credentials::ApiKeys {
                key: key.clone(),
                secret: secret.clone(),
            }),
            (None, None) => Ok(Credentials::None),
            (Some(_), None) => anyhow::bail!("api_key is set but api_secret is missing"),
            (None, Some(_)) => anyhow::bail!("api_secret is set but api_key is missing"),
        }
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let config = ClientConfig::new("http://file:9120")
            .with_api_keys("file-key", "file-secret")
            .apply_env_from(env(&[
                (ENV_ADDRESS, "https://env.example.com"),
                (ENV_API_KEY, "env-key"),
            ]));

        assert_eq!(config.address, "https://env.example.com");
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.api_secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config =
            ClientConfig::new("http://file:9120").apply_env_from(env(&[(ENV_ADDRESS, "  ")]));
        assert_eq!(config.address, "http://file:9120");
    }

    #[test]
    fn jwt_takes_precedence() {
        let config = ClientConfig::new("http://core")
            .with_api_keys("k", "s")
            .with_jwt("token");
        assert_eq!(config.credentials().unwrap(), Credentials::Jwt("token".to_string()));
    }

    #[test]
    fn half_configured_api_keys_error() {
        let mut config = ClientConfig::new("http://core");
        config.api_key = Some("k".to_string());
        let err = config.credentials().unwrap_err().to_string();
        assert!(err.contains("api_secret"));
    }

    #[test]
    fn no_credentials_is_allowed() {
        let config = ClientConfig::new("http://core");
        assert_eq!(config.credentials().unwrap(), Credentials::None);
    }

    #[test]
    fn validate_rejects_missing_and_bad_addresses() {
        assert!(ClientConfig::default().validate().is_err());
        assert!(ClientConfig::new("not a url").validate().is_err());
        assert!(ClientConfig::new("ftp://core").validate().is_err());
        assert!(ClientConfig::new("https://core.example.com").validate().is_ok());
    }

    #[test]
    fn toml_defaults_fill_timings() {
        let config: ClientConfig = toml::from_str(r#"address = "http://core""#).unwrap();
        assert_eq!(config.retry_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.poll_interval(), Duration::from_millis(1_000));
    }
}
