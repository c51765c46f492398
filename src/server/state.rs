//! Shared proxy state: the upstream job service, if a usable key exists.

use crate::adapters::live::replicate::ReplicateJobService;
use crate::config::{Config, PLACEHOLDER_API_KEY};
use crate::error::AppError;
use crate::ports::JobService;

/// State shared by all proxy handlers.
pub struct ProxyState {
    upstream: Result<Box<dyn JobService>, String>,
}

impl ProxyState {
    /// Build the proxy state from configuration.
    ///
    /// A missing or malformed key does not fail startup; it is reported by
    /// the health endpoint and by every forwarding call instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        match validate_api_key(config.replicate_key().as_deref()) {
            Ok(key) => {
                let upstream = ReplicateJobService::new(
                    &config.server.replicate_url,
                    key,
                    config.request_timeout(),
                )?;
                Ok(Self::with_upstream(Box::new(upstream)))
            }
            Err(reason) => Ok(Self::unconfigured(reason)),
        }
    }

    /// State that forwards to the given service.
    #[must_use]
    pub fn with_upstream(upstream: Box<dyn JobService>) -> Self {
        Self { upstream: Ok(upstream) }
    }

    /// State without a usable key.
    #[must_use]
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self { upstream: Err(reason.into()) }
    }

    /// Whether calls can be forwarded.
    #[must_use]
    pub fn api_key_configured(&self) -> bool {
        self.upstream.is_ok()
    }

    /// The upstream service, or why there is none.
    ///
    /// # Errors
    ///
    /// Returns the reason the key is unusable.
    pub fn upstream(&self) -> Result<&dyn JobService, &str> {
        self.upstream.as_deref().map_err(String::as_str)
    }
}

/// Check that a Replicate key is present and plausibly formed.
///
/// # Errors
///
/// Returns a message for the user when the key is missing, still the
/// placeholder, or contains whitespace.
pub fn validate_api_key(key: Option<&str>) -> Result<String, String> {
    let key = key.map(str::trim).unwrap_or_default();
    if key.is_empty() || key == PLACEHOLDER_API_KEY {
        return Err("Please add your Replicate API key to the .env file".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err("The Replicate API key contains whitespace; check for a copy/paste error".to_string());
    }
    if !key.starts_with("r8_") {
        log::warn!("Replicate API key does not start with 'r8_'; forwarding it anyway");
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_placeholder_keys_rejected() {
        assert!(validate_api_key(None).is_err());
        assert!(validate_api_key(Some("   ")).is_err());
        assert!(validate_api_key(Some("your_api_key_here")).is_err());
    }

    #[test]
    fn whitespace_inside_key_rejected() {
        let err = validate_api_key(Some("r8_abc def")).unwrap_err();
        assert!(err.contains("whitespace"));
    }

    #[test]
    fn well_formed_key_trimmed() {
        assert_eq!(validate_api_key(Some(" r8_abc\n")).unwrap(), "r8_abc");
    }

    #[test]
    fn configured_key_builds_upstream() {
        let config = Config {
            keys: crate::config::KeysConfig { replicate: Some("r8_from_config".into()) },
            ..Config::default()
        };
        let state = ProxyState::from_config(&config).unwrap();
        assert!(state.api_key_configured());
        assert!(state.upstream().is_ok());
    }

    #[test]
    fn unconfigured_state_reports_reason() {
        let state = ProxyState::unconfigured("no key");
        assert!(!state.api_key_configured());
        assert_eq!(state.upstream().err(), Some("no key"));
    }
}
