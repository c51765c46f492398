//! Proxy HTTP handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::state::ProxyState;
use crate::adapters::live::proxy::{HealthReport, TryOnBody, TryOnMultipleBody};
use crate::error::ServiceError;
use crate::model::ModelVariant;
use crate::ports::{EncodedGarment, JobSnapshot, SubmissionPayload};

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<Arc<ProxyState>> {
    Router::new()
        .route("/health", get(health))
        .route("/tryon", post(create_single))
        .route("/tryon-multiple", post(create_multiple))
        .route("/tryon/{id}", get(get_job))
}

/// A failed proxy call, rendered as a JSON error body.
#[derive(Debug)]
pub enum ProxyError {
    /// No usable Replicate key.
    NotConfigured(String),
    /// The client sent something unusable.
    BadRequest(String),
    /// Replicate could not be reached or refused the call.
    Upstream(ServiceError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotConfigured(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "API key not configured", "message": message }),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::Upstream(ServiceError::Status { status, message }) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": message, "status": status }),
            ),
            Self::Upstream(ServiceError::Timeout(message)) => {
                (StatusCode::GATEWAY_TIMEOUT, json!({ "error": message, "status": 504 }))
            }
            Self::Upstream(ServiceError::Transport(message) | ServiceError::Decode(message)) => {
                (StatusCode::BAD_GATEWAY, json!({ "error": message, "status": 502 }))
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn health(State(state): State<Arc<ProxyState>>) -> Json<HealthReport> {
    Json(HealthReport { status: "ok".to_string(), api_key_configured: state.api_key_configured() })
}

async fn create_single(
    State(state): State<Arc<ProxyState>>,
    Json(body): Json<TryOnBody>,
) -> Result<Json<JobSnapshot>, ProxyError> {
    let payload = SubmissionPayload {
        variant: ModelVariant::IdmVton,
        person_image: body.person_image,
        clothing_images: vec![EncodedGarment { name: body.category.clone(), image: body.clothing_image }],
        category: body.category,
    };
    create(&state, payload).await
}

async fn create_multiple(
    State(state): State<Arc<ProxyState>>,
    Json(body): Json<TryOnMultipleBody>,
) -> Result<Json<JobSnapshot>, ProxyError> {
    let payload = SubmissionPayload {
        variant: ModelVariant::NanoBananaPro,
        person_image: body.person_image,
        clothing_images: body.clothing_images,
        category: body.category,
    };
    create(&state, payload).await
}

async fn create(
    state: &ProxyState,
    payload: SubmissionPayload,
) -> Result<Json<JobSnapshot>, ProxyError> {
    let upstream = state.upstream().map_err(|m| ProxyError::NotConfigured(m.to_string()))?;

    if payload.person_image.is_empty() {
        return Err(ProxyError::BadRequest("personImage is required".into()));
    }
    if payload.clothing_images.is_empty() || payload.clothing_images.iter().any(|g| g.image.is_empty()) {
        return Err(ProxyError::BadRequest("at least one clothing image is required".into()));
    }

    log::info!(
        "creating {:?} prediction (category: {}, person image: {} bytes, garments: {})",
        payload.variant,
        payload.category,
        payload.person_image.len(),
        payload.clothing_images.len()
    );

    let snapshot = upstream.create_job(&payload).await.map_err(|e| {
        log::error!("create failed: {e}");
        ProxyError::Upstream(e)
    })?;
    log::info!("prediction {} created: {}", snapshot.id.as_deref().unwrap_or("-"), snapshot.status);
    Ok(Json(snapshot))
}

async fn get_job(
    State(state): State<Arc<ProxyState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ProxyError> {
    let upstream = state.upstream().map_err(|m| ProxyError::NotConfigured(m.to_string()))?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ProxyError::BadRequest(format!("invalid prediction id '{id}'")));
    }

    let snapshot = upstream.get_job(&id).await.map_err(|e| {
        log::error!("polling {id} failed: {e}");
        ProxyError::Upstream(e)
    })?;
    log::debug!("prediction {id}: {}", snapshot.status);
    Ok(Json(snapshot))
}
