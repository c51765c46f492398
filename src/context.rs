//! Service context that bundles all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::proxy::ProxyJobService;
use crate::adapters::live::replicate::ReplicateJobService;
use crate::adapters::recording::job_service::RecordingJobService;
use crate::adapters::replaying::job_service::ReplayingJobService;
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::Config;
use crate::error::AppError;
use crate::ports::JobService;

/// Where live job calls go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Through a fitloop proxy at the given base URL.
    Proxy(String),
    /// Straight to Replicate with the configured key.
    Direct,
}

/// Bundles all port trait objects into a single context.
pub struct ServiceContext {
    /// Job service port.
    pub jobs: Box<dyn JobService>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write the cassette to disk.
    ///
    /// The context that produced this session must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording adapter still has references".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        if recorder.is_empty() {
            log::warn!("no job service calls were made; writing an empty cassette");
        } else {
            log::debug!("writing {} recorded interactions", recorder.len());
        }
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context.
    ///
    /// # Errors
    ///
    /// Returns an error if direct mode has no API key, or the HTTP client
    /// cannot be built.
    pub fn live(route: &Route, config: &Config) -> Result<Self, AppError> {
        let timeout = config.request_timeout();
        let jobs: Box<dyn JobService> = match route {
            Route::Proxy(url) => {
                log::debug!("routing jobs through proxy at {url}");
                Box::new(ProxyJobService::new(url, timeout)?)
            }
            Route::Direct => {
                let key = config.replicate_key().ok_or(AppError::MissingApiKey)?;
                log::debug!("routing jobs directly to {}", config.server.replicate_url);
                Box::new(ReplicateJobService::new(&config.server.replicate_url, key, timeout)?)
            }
        };
        Ok(Self { jobs })
    }

    /// Create a recording context that wraps a live adapter with a recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be created.
    pub fn recording(route: &Route, config: &Config) -> Result<(Self, RecordingSession), AppError> {
        let live_ctx = Self::live(route, config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(".fitloop/cassettes")
            .join(&timestamp)
            .join("job_service.cassette.yaml");

        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-job_service"),
            get_commit_hash(),
        )));
        let jobs = RecordingJobService::new(live_ctx.jobs, Arc::clone(&recorder));

        Ok((Self { jobs: Box::new(jobs) }, RecordingSession { recorder }))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, AppError> {
        let replayer = load_cassette(path)
            .map_err(|e| AppError::Config(format!("Failed to load cassette: {e}")))?;
        let jobs = ReplayingJobService::new(Arc::new(Mutex::new(replayer)));
        Ok(Self { jobs: Box::new(jobs) })
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeysConfig;

    #[test]
    fn direct_route_without_key_fails() {
        std::env::remove_var("REPLICATE_API_TOKEN");
        std::env::remove_var("VITE_REPLICATE_API_KEY");
        let config = Config::default();
        assert!(matches!(
            ServiceContext::live(&Route::Direct, &config),
            Err(AppError::MissingApiKey)
        ));
    }

    #[test]
    fn direct_route_with_key_builds() {
        let config = Config {
            keys: KeysConfig { replicate: Some("r8_test".into()) },
            ..Config::default()
        };
        assert!(ServiceContext::live(&Route::Direct, &config).is_ok());
    }

    #[test]
    fn proxy_route_needs_no_key() {
        let route = Route::Proxy("http://localhost:3001/api".into());
        assert!(ServiceContext::live(&route, &Config::default()).is_ok());
    }

    #[test]
    fn missing_cassette_is_a_config_error() {
        let result = ServiceContext::replaying(Path::new("/nonexistent/x.cassette.yaml"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
