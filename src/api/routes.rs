//! REST endpoints wrapping the analysis core.
//!
//! The JSON shapes here preserve the pipeline's wire contract verbatim —
//! handlers translate between HTTP and the typed error taxonomy and add
//! nothing else.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::contacts::{ContactRegistry, RelationshipType};
use crate::error::{Error, StoreError};
use crate::events::EventBus;
use crate::pipeline::Analyzer;
use crate::pipeline::types::SourcePlatform;
use crate::store::Store;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub registry: Arc<ContactRegistry>,
    pub store: Arc<dyn Store>,
    pub events: Arc<EventBus>,
}

/// Build the Axum router with REST and WebSocket routes.
pub fn api_routes(state: AppState) -> Router {
    let events = Arc::clone(&state.events);
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/analysis/{message_id}", get(get_analysis))
        .route("/api/contacts", post(upsert_contact))
        .route("/api/contacts/{user_id}", get(list_contacts))
        .route("/api/contacts/{user_id}/{email}", delete(remove_contact))
        .with_state(state)
        .merge(crate::events::event_routes(events))
}

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    user_id: String,
    #[serde(default)]
    message_id: Option<String>,
    source_platform: SourcePlatform,
    raw_message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactRequest {
    user_id: String,
    email: String,
    #[serde(default)]
    name: String,
    relationship_type: RelationshipType,
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inbox-pulse"
    }))
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(user_id = %req.user_id, platform = %req.source_platform, "Analyze request");
    let result = state
        .analyzer
        .submit_for_analysis(
            &req.user_id,
            req.message_id,
            &req.raw_message,
            req.source_platform,
        )
        .await?;
    Ok(Json(result))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.load_analysis(&message_id).await.map_err(Error::from)? {
        Some(result) => Ok(Json(result)),
        None => Err(ApiError::not_found("analysis", &message_id)),
    }
}

async fn upsert_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .registry
        .upsert(&req.user_id, &req.email, &req.name, req.relationship_type)
        .await?;
    Ok(Json(contact))
}

async fn list_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.registry.list(&user_id).await.map_err(Error::from)?;
    Ok(Json(contacts))
}

async fn remove_contact(
    State(state): State<AppState>,
    Path((user_id, email)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    if state
        .registry
        .remove(&user_id, &email)
        .await
        .map_err(Error::from)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("contact", &email))
    }
}

// ── Error mapping ───────────────────────────────────────────────────

/// HTTP projection of the core error taxonomy.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(entity: &str, id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{entity} not found: {id}"),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Conflicts that survived the replay path and store outages are
            // both retriable.
            Error::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
            Error::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Analysis(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %err, "Request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
