//! HTTP API server.
//!
//! Exposes the ingest and insights pipeline over JSON HTTP for browser
//! extensions and dashboard clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/context` | Ingest a context event, returns ranked activities |
//! | `GET`  | `/insights` | Recent activities for a user, newest first |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses use a JSON envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "body must be a JSON object" } }
//! ```
//!
//! Error codes: `bad_request` (400), `missing_or_invalid_api_key` (401),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the capture
//! extension can post from any page context.
//!
//! # Authentication
//!
//! When `[server].api_key` is configured, requests must present the key in
//! an `x-api-key` header or as a bearer token. Unset means no gate.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::insights::{latest_activities, InsightsResponse};
use crate::models::IngestResponse;
use crate::normalize::normalize_event;
use crate::pipeline::process_event;
use crate::store::put_activities;
use crate::summarize::{create_summarizer, Summarizer};
use crate::{db, migrate};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: sqlx::SqlitePool,
    summarizer: Arc<dyn Summarizer>,
}

/// Starts the HTTP server on the configured bind address.
///
/// Runs migrations first so a fresh database works out of the box, then
/// serves until the process is terminated. The connection pool is opened
/// once and shared by every request.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    migrate::run_migrations(config).await?;
    let pool = db::connect(config).await?;

    let summarizer: Arc<dyn Summarizer> =
        Arc::from(create_summarizer(&config.summarizer, &config.pipeline)?);
    println!("Summarizer provider: {}", summarizer.provider_name());

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        summarizer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/context", post(handle_context))
        .route("/insights", get(handle_insights))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("Activity Lens listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "missing_or_invalid_api_key".to_string(),
        message: "missing or invalid API key".to_string(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Enforce the configured API key, accepting either an `x-api-key` header
/// or an `Authorization: Bearer` token. A missing config key disables the
/// gate entirely.
fn check_api_key(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = config.server.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Ok(());
    };

    let presented = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| {
                    auth.strip_prefix("Bearer ")
                        .or_else(|| auth.strip_prefix("bearer "))
                })
                .map(|token| token.trim().to_string())
        });

    match presented {
        Some(key) if key == expected => Ok(()),
        _ => Err(unauthorized()),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /context ============

/// Ingest one context event: normalize, cluster, summarize, rank, persist.
///
/// Persistence failures are logged but do not fail the response; the
/// ranked activity list is already computed and valid.
async fn handle_context(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<IngestResponse>, AppError> {
    check_api_key(&state.config, &headers)?;

    if !payload.is_object() {
        return Err(bad_request("body must be a JSON object"));
    }

    let event = normalize_event(payload);
    let response = process_event(&event, &state.config.pipeline, state.summarizer.as_ref()).await;

    if let Err(err) = put_activities(
        &state.pool,
        &event.user_id,
        &event.ts,
        &response.activities,
        state.config.db.ttl_days,
    )
    .await
    {
        eprintln!("failed to persist activities: {}", err);
    }

    Ok(Json(response))
}

// ============ GET /insights ============

#[derive(Debug, Deserialize)]
struct InsightsParams {
    user_id: Option<String>,
    limit: Option<i64>,
    since: Option<String>,
}

async fn handle_insights(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<InsightsParams>,
) -> Result<Json<InsightsResponse>, AppError> {
    check_api_key(&state.config, &headers)?;

    let user_id = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("dev-user");

    let response = latest_activities(
        &state.pool,
        user_id,
        params.limit,
        params.since.as_deref(),
    )
    .await
    .map_err(|e| internal(e.to_string()))?;

    Ok(Json(response))
}
