//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::adapters::live::replicate::REPLICATE_API_BASE;
use crate::poll::{PollOptions, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};

/// Placeholder key shipped in sample `.env` files.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// API key configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// How the client reaches the proxy.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Default polling policy.
    #[serde(default)]
    pub poll: PollConfig,

    /// Proxy server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// Replicate API token.
    pub replicate: Option<String>,
}

/// Client-side proxy settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the proxy API.
    pub url: String,
    /// Transport timeout for a single HTTP call.
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { url: "http://localhost:3001/api".to_string(), request_timeout_secs: 90 }
    }
}

/// Polling defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before each status poll, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of status polls.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(2000),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Proxy server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Upstream Replicate API root.
    pub replicate_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            replicate_url: REPLICATE_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Get the Replicate key, preferring environment variables.
    ///
    /// Placeholder and blank values are treated as absent.
    #[must_use]
    pub fn replicate_key(&self) -> Option<String> {
        std::env::var("REPLICATE_API_TOKEN")
            .ok()
            .or_else(|| std::env::var("VITE_REPLICATE_API_KEY").ok())
            .or_else(|| self.keys.replicate.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
    }

    /// Get the proxy base URL, preferring the `FITLOOP_PROXY_URL` environment variable.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        std::env::var("FITLOOP_PROXY_URL").unwrap_or_else(|_| self.proxy.url.clone())
    }

    /// Transport timeout for a single HTTP call.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy.request_timeout_secs.max(1))
    }

    /// Poll options from config, with optional overrides.
    #[must_use]
    pub fn poll_options(&self, interval_ms: Option<u64>, max_attempts: Option<u32>) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(interval_ms.unwrap_or(self.poll.interval_ms)),
            max_attempts: max_attempts.unwrap_or(self.poll.max_attempts),
        }
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `FITLOOP_CONFIG` environment variable
/// 3. `~/.config/fitloop/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("FITLOOP_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

/// Default config path: `~/.config/fitloop/config.toml`.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/fitloop/config.toml")
    } else {
        PathBuf::from("fitloop.toml")
    }
}
