//! The credential-holding proxy.
//!
//! Forwards try-on calls to Replicate so that the API key never leaves the
//! server, and exposes a liveness endpoint that reports whether a key is set.

pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::AppError;
pub use state::ProxyState;

/// Largest accepted request body; base64 photos are big.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the proxy application.
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind and run the proxy until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: &Config, host: &str, port: u16) -> Result<(), AppError> {
    let state = ProxyState::from_config(config)?;
    if let Err(reason) = state.upstream() {
        log::warn!("API key not configured: {reason}");
    }
    let configured = state.api_key_configured();

    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    log::info!("proxy running on http://{addr}");
    log::info!("try-on endpoint: http://{addr}/api/tryon-multiple");
    log::info!("API key configured: {}", if configured { "yes" } else { "no" });

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::{json, Value};

    use super::*;
    use crate::adapters::live::proxy::ProxyJobService;
    use crate::adapters::live::replicate::ReplicateJobService;
    use crate::error::{JobError, ServiceError};
    use crate::model::ModelVariant;
    use crate::poll::{submit_and_await, PollOptions};
    use crate::ports::JobService;
    use crate::request::tests::request;

    const KEY: &str = "r8_test";

    /// Counts status polls; the second one succeeds.
    #[derive(Default)]
    struct FakeReplicate {
        polls: AtomicU32,
    }

    fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
        let expected = format!("Token {KEY}");
        if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str()) {
            Ok(())
        } else {
            Err((StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."}))))
        }
    }

    async fn fake_create_version(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        authorized(&headers)?;
        assert_eq!(body["version"], crate::model::IDM_VTON_VERSION);
        assert_eq!(body["input"]["category"], "upper_body");
        assert!(body["input"]["human_img"].as_str().unwrap().starts_with("data:image/png"));
        Ok(Json(json!({"id": "pred-1", "status": "starting"})))
    }

    async fn fake_create_model(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        authorized(&headers)?;
        assert_eq!(headers.get("prefer").unwrap(), "wait");
        assert_eq!(body["input"]["image_input"].as_array().unwrap().len(), 3);
        Ok(Json(json!({
            "id": "pred-2",
            "status": "succeeded",
            "output": ["https://replicate.delivery/sync.jpg"]
        })))
    }

    async fn fake_get(
        State(fake): State<Arc<FakeReplicate>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        authorized(&headers)?;
        assert_eq!(id, "pred-1");
        let n = fake.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Json(if n < 2 {
            json!({"id": id, "status": "processing", "output": null})
        } else {
            json!({"id": id, "status": "succeeded", "output": "https://replicate.delivery/out.jpg"})
        }))
    }

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    /// Fake Replicate + proxy in front of it; returns the proxy API base and the fake.
    async fn stack(key: &str) -> (String, Arc<FakeReplicate>) {
        let fake = Arc::new(FakeReplicate::default());
        let replicate_app = Router::new()
            .route("/predictions", post(fake_create_version))
            .route("/models/google/nano-banana-pro/predictions", post(fake_create_model))
            .route("/predictions/{id}", get(fake_get))
            .with_state(Arc::clone(&fake));
        let replicate_url = spawn(replicate_app).await;

        let upstream =
            ReplicateJobService::new(&replicate_url, key.to_string(), Duration::from_secs(5)).unwrap();
        let proxy_url = spawn(router(Arc::new(ProxyState::with_upstream(Box::new(upstream))))).await;
        (format!("{proxy_url}/api"), fake)
    }

    fn fast() -> PollOptions {
        PollOptions { interval: Duration::from_millis(10), max_attempts: 5 }
    }

    #[tokio::test]
    async fn polls_through_proxy_until_succeeded() {
        let (api, fake) = stack(KEY).await;
        let client = ProxyJobService::new(&api, Duration::from_secs(5)).unwrap();
        let mut req = request(1);
        req.variant = ModelVariant::IdmVton;

        let artifact = submit_and_await(&client, &req, &fast()).await.unwrap();

        assert_eq!(artifact.urls, vec!["https://replicate.delivery/out.jpg"]);
        assert_eq!(fake.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn synchronous_model_skips_polling() {
        let (api, fake) = stack(KEY).await;
        let client = ProxyJobService::new(&api, Duration::from_secs(5)).unwrap();

        let artifact = submit_and_await(&client, &request(2), &fast()).await.unwrap();

        assert_eq!(artifact.primary(), "https://replicate.delivery/sync.jpg");
        assert_eq!(fake.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_auth_failure_is_forwarded() {
        let (api, _fake) = stack("r8_wrong").await;
        let client = ProxyJobService::new(&api, Duration::from_secs(5)).unwrap();

        let err = submit_and_await(&client, &request(1), &fast()).await.unwrap_err();

        match &err {
            JobError::Submission(ServiceError::Status { status, message }) => {
                assert_eq!(*status, 401);
                assert_eq!(message, "Invalid token.");
            }
            other => panic!("expected submission error, got {other:?}"),
        }
        assert!(err.to_string().contains("invalid API key"));
    }

    #[tokio::test]
    async fn unconfigured_proxy_reports_and_refuses() {
        let state = ProxyState::unconfigured("Please add your Replicate API key to the .env file");
        let api = format!("{}/api", spawn(router(Arc::new(state))).await);
        let client = ProxyJobService::new(&api, Duration::from_secs(5)).unwrap();

        let health = client.health().await.unwrap();
        assert_eq!(health.status, "ok");
        assert!(!health.api_key_configured);

        let payload = request(1).encode().unwrap();
        let err = client.create_job(&payload).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Status { status: 400, message: "API key not configured".into() }
        );
    }

    #[tokio::test]
    async fn malformed_prediction_id_rejected() {
        let (api, fake) = stack(KEY).await;
        let client = ProxyJobService::new(&api, Duration::from_secs(5)).unwrap();

        let err = client.get_job("..%2Fsecrets").await.unwrap_err();

        assert!(matches!(err, ServiceError::Status { status: 400, .. }));
        assert_eq!(fake.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_proxy_is_a_transport_error() {
        let client = ProxyJobService::new("http://127.0.0.1:9/api", Duration::from_secs(5)).unwrap();
        let err = submit_and_await(&client, &request(1), &fast()).await.unwrap_err();
        assert!(matches!(err, JobError::Submission(ServiceError::Transport(_))));
        assert!(err.to_string().contains("fitloop serve"));
    }
}
