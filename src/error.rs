//! Error types for fitloop.
//!
//! Three layers: [`ServiceError`] is what a [`JobService`](crate::ports::JobService)
//! call can fail with, [`JobError`] is the outcome taxonomy of a single
//! try-on, and [`AppError`] is what the binary reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed call against a job service (proxy or Replicate).
///
/// Serializable so that cassettes can replay failures faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ServiceError {
    /// The transport gave up waiting for the call.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The call never produced an HTTP response (connection refused, reset, DNS).
    #[error("network error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text extracted from the response body.
        message: String,
    },

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Human-readable explanation of a failed job submission.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => {
                "could not reach the try-on proxy. Start it with: fitloop serve".to_string()
            }
            Self::Status { status: 401, .. } => {
                "invalid API key. Check the Replicate key in your config or .env file".to_string()
            }
            Self::Status { status: 402, .. } => {
                "no API credits available. Add credits to your Replicate account".to_string()
            }
            Self::Status { status: 429, .. } => {
                "rate limit exceeded. Wait a moment and try again".to_string()
            }
            Self::Status { status, message } => format!("API error ({status}): {message}"),
            Self::Timeout(msg) | Self::Decode(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status { status: status.as_u16(), message: e.to_string() }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Why a try-on did not produce an artifact.
///
/// Exactly one of these, or an artifact, comes out of every
/// [`submit_and_await`](crate::poll::submit_and_await) call.
#[derive(Debug, Error)]
pub enum JobError {
    /// The caller's request is unusable; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An image could not be read or encoded; nothing was sent.
    #[error("could not encode image: {0}")]
    Encoding(String),

    /// The create-job call failed. Never retried.
    #[error("submission failed: {}", .0.user_message())]
    Submission(ServiceError),

    /// The remote service accepted the job and then reported a failure.
    #[error("processing failed: {0}")]
    JobFailed(String),

    /// The poll budget ran out before the job reached a terminal state.
    #[error("processing timed out after {attempts} polls - try-on took too long{}",
        .last_error.as_deref().map(|e| format!(" (last error: {e})")).unwrap_or_default())]
    JobTimeout {
        /// Number of status polls issued.
        attempts: u32,
        /// The most recent swallowed poll error, if any.
        last_error: Option<String>,
    },

    /// The in-flight call was cut short by a timeout or an interrupt.
    #[error("aborted: {0}")]
    Aborted(String),
}

/// Errors reported by the `fitloop` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A try-on did not produce an artifact.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A network error outside of the job protocol (downloads, health checks).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A direct call against the proxy failed.
    #[error("{}", .0.user_message())]
    Service(#[from] ServiceError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An artifact could not be fetched or written.
    #[error("Output error: {0}")]
    Output(String),

    /// No Replicate key configured where one is required.
    #[error("No Replicate API key. Set REPLICATE_API_TOKEN or add it to the config file.")]
    MissingApiKey,
}
