//! HTTP API.
//!
//! # Endpoints
//!
//! | Method   | Path                          | Description                              |
//! |----------|-------------------------------|------------------------------------------|
//! | `POST`   | `/api/process-and-summarize`  | Run the pipeline for one uploaded PDF    |
//! | `GET`    | `/api/summaries`              | The caller's summaries, newest first     |
//! | `GET`    | `/api/summaries/{id}`         | One summary with normalised slides       |
//! | `GET`    | `/api/summaries/{id}/export`  | The summary as a markdown attachment     |
//! | `DELETE` | `/api/summaries/{id}`         | Delete a summary                         |
//! | `GET`    | `/health`                     | Health check (returns version)           |
//!
//! # Identity
//!
//! Authentication is done upstream. The identity provider forwards the
//! verified user id in `x-user-id` (and optionally `x-user-email`); requests
//! to `/api/*` without it are answered with 401. The user row is created on
//! first sight.
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": "<message for users>", "details": "<internal message>" }
//! ```
//!
//! Status codes come from [`PdfDeckError::status_code`]: 400 for validation,
//! file type and file size, 401 without identity, 404 for unknown summaries,
//! 500 otherwise. Bodies over the configured limit get 413 from the body
//! limit layer.

use crate::config::{ServerConfig, SummaryConfig};
use crate::error::{ErrorKind, PdfDeckError};
use crate::export::{export_file_name, to_markdown};
use crate::output::{ProcessedSummary, SummaryMetadata};
use crate::pipeline::input::is_url;
use crate::pipeline::llm::{LlmSummaryModel, SummaryModel};
use crate::process::{process_and_store, validate_request, ProcessRequest};
use crate::progress::NoopProgressSink;
use crate::store::{PersistedSummary, SqliteStore, SummaryRepository, SummaryStatus, User};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Header carrying the verified user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Optional header carrying the user's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SummaryRepository>,
    pub model: Arc<dyn SummaryModel>,
    pub config: Arc<SummaryConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SummaryRepository>,
        model: Arc<dyn SummaryModel>,
        config: SummaryConfig,
    ) -> Self {
        Self {
            store,
            model,
            config: Arc::new(config),
        }
    }
}

/// Build the router with all routes and layers.
pub fn router(state: AppState, max_request_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/process-and-summarize", post(handle_process))
        .route("/api/summaries", get(handle_list))
        .route("/api/summaries/{id}", get(handle_get).delete(handle_delete))
        .route("/api/summaries/{id}/export", get(handle_export))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Connect the store, resolve the model provider, and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), PdfDeckError> {
    let store = SqliteStore::connect(&config.database_url).await?;
    let model = LlmSummaryModel::from_config(&config.summary)?;
    let state = AppState::new(Arc::new(store), Arc::new(model), config.summary.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| PdfDeckError::Internal(format!("cannot bind {}: {}", config.bind, e)))?;
    info!("pdfdeck API listening on http://{}", config.bind);

    axum::serve(listener, router(state, config.max_request_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PdfDeckError::Internal(format!("server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    details: String,
    kind: ErrorKind,
}

/// Wraps [`PdfDeckError`] so handlers can return it with `?`.
pub struct ApiError(pub PdfDeckError);

impl From<PdfDeckError> for ApiError {
    fn from(e: PdfDeckError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            success: false,
            error: self.0.user_message(),
            details: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// Caller identity taken from the upstream identity headers.
#[derive(Debug, Clone)]
pub struct Identity {
    pub external_id: String,
    pub email: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let external_id = header_str(USER_ID_HEADER).ok_or(PdfDeckError::Authentication)?;
        Ok(Identity {
            external_id,
            email: header_str(USER_EMAIL_HEADER),
        })
    }
}

async fn current_user(state: &AppState, identity: &Identity) -> Result<User, PdfDeckError> {
    state
        .store
        .upsert_user(&identity.external_id, identity.email.as_deref())
        .await
}

// ── POST /api/process-and-summarize ──────────────────────────────────────────

#[derive(Serialize)]
struct ProcessResponse {
    success: bool,
    summary: ProcessedSummary,
    id: String,
}

async fn handle_process(
    State(state): State<AppState>,
    identity: Identity,
    body: Bytes,
) -> Result<Json<ProcessResponse>, ApiError> {
    let request: ProcessRequest =
        serde_json::from_slice(&body).map_err(|e| PdfDeckError::Validation {
            details: format!("fileUrl, fileName (invalid JSON body: {e})"),
        })?;
    validate_request(&request)?;
    if !is_url(&request.file_url) {
        return Err(PdfDeckError::Validation {
            details: "fileUrl (must be an http or https URL)".into(),
        }
        .into());
    }

    let user = current_user(&state, &identity).await?;
    let stored = process_and_store(
        state.store.as_ref(),
        &user.id,
        &request,
        &state.config,
        Arc::clone(&state.model),
        &NoopProgressSink,
    )
    .await?;

    Ok(Json(ProcessResponse {
        success: true,
        summary: stored.outcome.summary,
        id: stored.id,
    }))
}

// ── GET /api/summaries ───────────────────────────────────────────────────────

/// A stored summary as the API shows it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub id: String,
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub original_file_url: String,
    pub status: SummaryStatus,
    pub slides: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PersistedSummary> for SummaryView {
    fn from(row: PersistedSummary) -> Self {
        let slides = row.slides();
        Self {
            id: row.id,
            title: row.title,
            file_name: row.file_name,
            original_file_url: row.original_file_url,
            status: row.status,
            slides,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    summaries: Vec<SummaryView>,
}

async fn handle_list(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ListResponse>, ApiError> {
    let user = current_user(&state, &identity).await?;
    let rows = state.store.list_summaries(&user.id).await?;
    Ok(Json(ListResponse {
        success: true,
        summaries: rows.into_iter().map(SummaryView::from).collect(),
    }))
}

// ── /api/summaries/{id} ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct GetResponse {
    success: bool,
    summary: SummaryView,
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: &str,
) -> Result<PersistedSummary, PdfDeckError> {
    let user = current_user(state, identity).await?;
    state
        .store
        .get_summary(&user.id, id)
        .await?
        .ok_or_else(|| PdfDeckError::NotFound { id: id.to_string() })
}

async fn handle_get(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<GetResponse>, ApiError> {
    let row = find_owned(&state, &identity, &id).await?;
    Ok(Json(GetResponse {
        success: true,
        summary: row.into(),
    }))
}

async fn handle_export(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let row = find_owned(&state, &identity, &id).await?;
    let slides = row.slides();
    let title = row
        .title
        .clone()
        .unwrap_or_else(|| row.file_name.clone().unwrap_or_else(|| "Summary".into()));
    let metadata = SummaryMetadata {
        file_name: row.file_name.clone().unwrap_or_default(),
        page_count: 0,
        word_count: 0,
        processing_time: 0,
    };

    let markdown = to_markdown(&title, &slides, Some(&metadata));
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(&title));

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        markdown,
    )
        .into_response())
}

async fn handle_delete(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state, &identity).await?;
    if state.store.delete_summary(&user.id, &id).await? {
        info!("Deleted summary {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PdfDeckError::NotFound { id }.into())
    }
}

// ── GET /health ──────────────────────────────────────────────────────────────

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
