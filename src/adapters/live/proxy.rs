//! Live adapter for the fitloop proxy.
//!
//! The proxy holds the Replicate key; this client only ever talks to it.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::ModelVariant;
use crate::ports::job_service::{EncodedGarment, JobFuture, JobService, SubmissionPayload};

/// Body of `POST /tryon` (single garment).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnBody {
    /// Subject photo as a `data:` URI.
    pub person_image: String,
    /// Garment image as a `data:` URI.
    pub clothing_image: String,
    /// UI category.
    #[serde(default = "default_category")]
    pub category: String,
}

/// Body of `POST /tryon-multiple`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnMultipleBody {
    /// Subject photo as a `data:` URI.
    pub person_image: String,
    /// Named garment images.
    pub clothing_images: Vec<EncodedGarment>,
    /// UI category.
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "shirts".to_string()
}

/// Liveness report from `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Always `"ok"` when the proxy answers.
    pub status: String,
    /// Whether the proxy holds a usable Replicate key.
    pub api_key_configured: bool,
}

/// Error body returned by the proxy (`error`) or Replicate (`detail`) on failure.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
    message: Option<String>,
}

/// Job service that forwards to a fitloop proxy.
pub struct ProxyJobService {
    client: Client,
    base_url: String,
}

impl ProxyJobService {
    /// Create a client for the proxy rooted at `base_url` (e.g. `http://localhost:3001/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Query the proxy's liveness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy is unreachable or answers with a failure.
    pub async fn health(&self) -> Result<HealthReport, ServiceError> {
        let response = self.client.get(format!("{}/health", self.base_url)).send().await?;
        read_json(response).await
    }
}

impl JobService for ProxyJobService {
    fn create_job(&self, payload: &SubmissionPayload) -> JobFuture<'_> {
        let builder = match payload.variant {
            ModelVariant::IdmVton => {
                let body = TryOnBody {
                    person_image: payload.person_image.clone(),
                    clothing_image: payload
                        .clothing_images
                        .first()
                        .map(|g| g.image.clone())
                        .unwrap_or_default(),
                    category: payload.category.clone(),
                };
                self.client.post(format!("{}/tryon", self.base_url)).json(&body)
            }
            ModelVariant::NanoBananaPro => {
                let body = TryOnMultipleBody {
                    person_image: payload.person_image.clone(),
                    clothing_images: payload.clothing_images.clone(),
                    category: payload.category.clone(),
                };
                self.client.post(format!("{}/tryon-multiple", self.base_url)).json(&body)
            }
        };

        Box::pin(async move {
            let response = builder.send().await?;
            read_json(response).await
        })
    }

    fn get_job(&self, id: &str) -> JobFuture<'_> {
        let url = format!("{}/tryon/{id}", self.base_url);
        Box::pin(async move {
            let response = self.client.get(url).send().await?;
            read_json(response).await
        })
    }
}

/// Decode a JSON body, turning non-2xx responses into [`ServiceError::Status`].
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ServiceError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ServiceError::Status { status: status.as_u16(), message: error_message(&text) });
    }

    serde_json::from_str(&text).map_err(|e| ServiceError::Decode(format!("{e}: {}", truncate(&text))))
}

/// Pull the most useful message out of an error body.
fn error_message(text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody { error: Some(error), .. }) => error,
        Ok(ErrorBody { detail: Some(detail), .. }) => detail,
        Ok(ErrorBody { message: Some(message), .. }) => message,
        _ => truncate(text),
    }
}

fn truncate(text: &str) -> String {
    if text.len() > 500 {
        let end = (0..=500).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}
