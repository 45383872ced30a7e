use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Json, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use crate::environment::Settings;
use crate::job_card::{JobCardRequest, JobCardResponse};
use crate::llm::CompletionBackend;
use crate::pipeline::generate_job_card;
use crate::TARGET_WEB_REQUEST;

/// Shared, read-only state handed to every request.
pub struct AppState<B> {
    backend: Arc<B>,
    started_at: DateTime<Utc>,
}

impl<B> AppState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            started_at: Utc::now(),
        }
    }
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            started_at: self.started_at,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    model: String,
    started_at: String,
}

/// Builds the relay's routes around `backend`.
pub fn router<B: CompletionBackend + 'static>(backend: B, body_limit: usize) -> Router {
    Router::new()
        .route("/jobcard", post(job_card::<B>))
        .route("/status", get(status_check::<B>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(cors))
        .with_state(AppState::new(backend))
}

/// Runs the relay until Ctrl-C.
pub async fn app_api_loop<B: CompletionBackend + 'static>(
    settings: &Settings,
    backend: B,
) -> Result<()> {
    let app = router(backend, settings.body_limit);
    let addr = settings.listen_addr();

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Job card relay running on http://{}", addr);
    info!(
        "Using Ollama at {}:{} (model {})",
        settings.ollama_host, settings.ollama_port, settings.model
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server stopped unexpectedly")?;

    info!("Job card relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
}

/// Generates a job card. Always answers 200; a failed model call shows up as
/// `warning` next to the fallback card.
async fn job_card<B: CompletionBackend + 'static>(
    State(state): State<AppState<B>>,
    Json(request): Json<JobCardRequest>,
) -> Json<JobCardResponse> {
    info!(
        target: TARGET_WEB_REQUEST,
        "POST /jobcard title={:?} url={:?} text_len={}",
        request.title.as_deref().unwrap_or_default(),
        request.url.as_deref().unwrap_or_default(),
        request.text.as_deref().map(str::len).unwrap_or(0)
    );

    let response = generate_job_card(state.backend.as_ref(), &request).await;
    if let Some(warning) = &response.warning {
        info!(target: TARGET_WEB_REQUEST, "Answering with fallback card: {}", warning);
    }

    Json(response)
}

async fn status_check<B: CompletionBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<StatusResponse> {
    debug!(target: TARGET_WEB_REQUEST, "GET /status");

    Json(StatusResponse {
        status: "OK",
        model: state.backend.model().to_string(),
        started_at: state.started_at.to_rfc3339(),
    })
}

/// Lets the browser extension call the relay from any origin.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        add_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    add_cors_headers(response.headers_mut());
    response
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_card::JobCard;
    use crate::pipeline::tests::StubBackend;
    use serde_json::{json, Value};

    async fn spawn_relay(backend: StubBackend, body_limit: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(backend, body_limit);
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_handler_returns_normalized_card() {
        let state = AppState::new(StubBackend::replying(
            r#"{"task_name":"Reset Breaker","steps":["Open panel","Flip switch"]}"#,
        ));
        let request = JobCardRequest::new("Breaker Reset", "https://x", "...");

        let Json(response) = job_card(State(state), Json(request)).await;

        assert!(response.warning.is_none());
        assert_eq!(response.job_card.task_name, "Reset Breaker");
        assert_eq!(response.job_card.steps, vec!["Open panel", "Flip switch"]);
    }

    #[tokio::test]
    async fn test_handler_reports_backend_failure_as_warning() {
        let state = AppState::new(StubBackend::failing("connection refused"));
        let request = JobCardRequest::new("Breaker Reset", "https://x", "...");

        let Json(response) = job_card(State(state), Json(request.clone())).await;

        assert_eq!(response.job_card, JobCard::fallback(&request));
        assert!(response
            .warning
            .unwrap()
            .ends_with("connection refused"));
    }

    #[tokio::test]
    async fn test_post_jobcard_over_http() {
        let base = spawn_relay(StubBackend::replying("not json at all"), 1024 * 1024).await;

        let response = reqwest::Client::new()
            .post(format!("{}/jobcard", base))
            .json(&json!({ "title": "Breaker Reset", "url": "https://x", "text": "..." }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["job_card"]["task_name"], "Breaker Reset");
        assert_eq!(body["job_card"]["needs_review"], true);
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn test_post_jobcard_with_failed_backend_still_200() {
        let base = spawn_relay(StubBackend::failing("Ollama error 503"), 1024 * 1024).await;

        let response = reqwest::Client::new()
            .post(format!("{}/jobcard", base))
            .json(&json!({}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["job_card"]["task_name"], "Untitled Task");
        assert_eq!(
            body["warning"],
            "Used fallback (local model call failed): Ollama error 503"
        );
    }

    #[tokio::test]
    async fn test_preflight_is_answered() {
        let base = spawn_relay(StubBackend::replying("{}"), 1024 * 1024).await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{}/jobcard", base))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
        assert!(response
            .headers()
            .get("access-control-allow-methods")
            .is_some());
    }

    #[tokio::test]
    async fn test_oversized_and_malformed_bodies_are_rejected() {
        let base = spawn_relay(StubBackend::replying("{}"), 256).await;
        let client = reqwest::Client::new();

        let oversized = client
            .post(format!("{}/jobcard", base))
            .json(&json!({ "text": "x".repeat(10_000) }))
            .send()
            .await
            .unwrap();
        assert_eq!(oversized.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);

        let malformed = client
            .post(format!("{}/jobcard", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert!(malformed.status().is_client_error());
    }

    #[tokio::test]
    async fn test_status_reports_model() {
        let base = spawn_relay(StubBackend::replying("{}"), 1024).await;

        let body: Value = reqwest::get(format!("{}/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "OK");
        assert_eq!(body["model"], "stub");
        assert!(body["started_at"].is_string());
    }
}
