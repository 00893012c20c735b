//! datadict HTTP API
//!
//! Axum-based HTTP server relaying dictionary generation and dictionary chat
//! to the AI gateway.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - POST /generate  data sample in, data dictionary out
//! - POST /chat  question about a dictionary, answer out
//! - GET  /health  liveness plus whether an API key is configured
//! - GET  /version  server version info
//!
//! Every failure is answered as `{ "detail": string }` and logged once, here.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use datadict_core::{
    AiGateway, ChatRequestContext, ChatSessionBuilder, ChatTurn, CredentialResolver,
    DataDictionary, DictionaryGenerator, RelayConfig, RelayError,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub config: RelayConfig,
    pub credentials: CredentialResolver,
    pub generator: DictionaryGenerator,
    pub chat: ChatSessionBuilder,
}

impl HttpState {
    pub fn new(
        config: RelayConfig,
        credentials: CredentialResolver,
        gateway: Arc<dyn AiGateway>,
    ) -> Self {
        Self {
            config,
            credentials,
            generator: DictionaryGenerator::new(gateway.clone()),
            chat: ChatSessionBuilder::new(gateway),
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let router = Router::new()
        .route("/generate", post(generate_handler))
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler));

    let router = if state.config.cors.allow_any_origin {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("datadict HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub dictionary: DataDictionary,
    pub message: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: String,
}

impl GenerateRequest {
    fn validate(&self) -> Result<(), RelayError> {
        if self.data.trim().is_empty() {
            return Err(RelayError::malformed("data must not be empty"));
        }
        Ok(())
    }
}

impl ChatRequest {
    fn validate(&self) -> Result<(), RelayError> {
        if self.message.trim().is_empty() {
            return Err(RelayError::malformed("message must not be empty"));
        }
        self.dictionary
            .validate()
            .map_err(|e| RelayError::malformed(format!("invalid dictionary: {}", e)))
    }

    fn into_context(self) -> ChatRequestContext {
        ChatRequestContext {
            dictionary: self.dictionary,
            message: self.message,
            history: self.history,
        }
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner generate: validate, resolve the key, then make the single gateway call.
pub async fn generate_inner(state: &HttpState, req: GenerateRequest) -> (StatusCode, serde_json::Value) {
    into_reply(run_generate(state, req).await)
}

/// Inner chat: validate, resolve the key, then rebuild the session and ask.
pub async fn chat_inner(state: &HttpState, req: ChatRequest) -> (StatusCode, serde_json::Value) {
    into_reply(run_chat(state, req).await)
}

async fn run_generate(state: &HttpState, req: GenerateRequest) -> Result<serde_json::Value, RelayError> {
    req.validate()?;
    let key = state.credentials.resolve()?;
    let generated = state.generator.generate(&key, &req.data).await?;
    Ok(generated.payload)
}

async fn run_chat(state: &HttpState, req: ChatRequest) -> Result<serde_json::Value, RelayError> {
    req.validate()?;
    let key = state.credentials.resolve()?;
    let response = state.chat.reply(&key, req.into_context()).await?;
    Ok(serde_json::to_value(ChatResponse { response })?)
}

/// Inner health. Never touches the gateway.
pub fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.config.gateway.model,
            "credential_configured": state.credentials.is_configured(),
        }),
    )
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "datadict/1",
    })
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let span = tracing::info_span!("request", endpoint = "/generate", request_id = %Uuid::new_v4());
    let (status, body) = async move {
        match payload {
            Ok(Json(req)) => generate_inner(&state, req).await,
            Err(rejection) => reject(rejection),
        }
    }
    .instrument(span)
    .await;
    (status, Json(body))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let span = tracing::info_span!("request", endpoint = "/chat", request_id = %Uuid::new_v4());
    let (status, body) = async move {
        match payload {
            Ok(Json(req)) => chat_inner(&state, req).await,
            Err(rejection) => reject(rejection),
        }
    }
    .instrument(span)
    .await;
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Map a relay outcome onto the HTTP boundary. The only place errors are logged.
pub fn into_reply(
    result: Result<serde_json::Value, RelayError>,
) -> (StatusCode, serde_json::Value) {
    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_reply(&e),
    }
}

pub fn error_reply(e: &RelayError) -> (StatusCode, serde_json::Value) {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(kind = e.kind(), error = %e, "Request failed");
    } else {
        tracing::warn!(kind = e.kind(), error = %e, "Request rejected");
    }

    let body = serde_json::json!({ "detail": e.detail() });
    (status, body)
}

fn reject(rejection: JsonRejection) -> (StatusCode, serde_json::Value) {
    error_reply(&RelayError::malformed(rejection.body_text()))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
