//! REST endpoints for the wizard, property proxy, and auth.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::api::PropertyApi;
use crate::error::FlowError;
use crate::flow::{NoticeLevel, ResolveChoice, WizardOrchestrator};
use crate::session::Session;
use crate::timeline::Timeline;
use crate::validate;

use super::ws::ws_handler;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<WizardOrchestrator>,
    pub timeline: Arc<Timeline>,
    pub session: Arc<Session>,
    pub api: Arc<dyn PropertyApi>,
}

/// Build the axum router with wizard WebSocket and REST routes.
pub fn wizard_routes(
    orchestrator: Arc<WizardOrchestrator>,
    timeline: Arc<Timeline>,
    session: Arc<Session>,
    api: Arc<dyn PropertyApi>,
) -> Router {
    let state = AppState {
        orchestrator,
        timeline,
        session,
        api,
    };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/wizard/status", get(wizard_status))
        .route("/api/wizard/timeline", get(wizard_timeline))
        .route("/api/wizard/start", post(wizard_start))
        .route("/api/wizard/goto/{step}", post(wizard_goto))
        .route("/api/wizard/next", post(wizard_next))
        .route("/api/wizard/resolve", post(wizard_resolve))
        .route("/api/property/lookup", post(property_lookup))
        .route("/api/property/{id}/facts", get(property_facts))
        .route("/api/property/{id}/upload/{step}", post(property_upload))
        .route("/api/auth/logout", post(auth_logout))
        .route("/api/auth/change-password", post(auth_change_password))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn flow_error_response(err: &FlowError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        FlowError::UnknownTurn { .. } => StatusCode::NOT_FOUND,
        FlowError::NotInteractive { .. }
        | FlowError::AlreadyResolved { .. }
        | FlowError::SubmissionInFlight { .. }
        | FlowError::Disposed => StatusCode::CONFLICT,
        FlowError::NoScript { .. } => StatusCode::NOT_FOUND,
    };
    (status, Json(serde_json::json!({"error": err.to_string()})))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "offer-flow"
    }))
}

// ── Wizard ──────────────────────────────────────────────────────────────

async fn wizard_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.orchestrator.status().await;
    Json(serde_json::json!(status))
}

async fn wizard_timeline(State(state): State<AppState>) -> impl IntoResponse {
    let turns = state.timeline.snapshot().await;
    Json(turns)
}

async fn wizard_start(State(state): State<AppState>) -> impl IntoResponse {
    state.orchestrator.start().await;
    let status = state.orchestrator.status().await;
    Json(serde_json::json!(status))
}

async fn wizard_goto(
    State(state): State<AppState>,
    Path(step): Path<usize>,
) -> impl IntoResponse {
    let entered = state.orchestrator.goto(step).await;
    Json(serde_json::json!({"step": entered}))
}

async fn wizard_next(State(state): State<AppState>) -> impl IntoResponse {
    let entered = state.orchestrator.next().await;
    Json(serde_json::json!({"step": entered}))
}

#[derive(Deserialize)]
struct ResolveRequest {
    turn_id: String,
    #[serde(default)]
    option_id: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

async fn wizard_resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveRequest>,
) -> impl IntoResponse {
    let choice = ResolveChoice {
        option_id: body.option_id,
        data: body.data,
    };
    match state.orchestrator.resolve(&body.turn_id, choice).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "outcome": outcome.as_str(),
                "step": state.orchestrator.current_step().await,
            })),
        ),
        Err(e) => flow_error_response(&e),
    }
}

// ── Property ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LookupRequest {
    turn_id: String,
    address: String,
}

/// Look up the property for the address widget, store it in the session,
/// and resolve the widget. A failed backend call leaves the widget
/// resubmittable and surfaces a notice instead of advancing the script.
async fn property_lookup(
    State(state): State<AppState>,
    Json(body): Json<LookupRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate::validate_address(&body.address) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": e.to_string(), "field": "address"})),
        );
    }

    if let Err(e) = state.orchestrator.begin_submission(&body.turn_id).await {
        return flow_error_response(&e);
    }

    let key = body.address.trim();
    match state.api.fetch_property(key).await {
        Ok(property) => {
            state.session.set_selected_property(property.clone()).await;
            let choice = ResolveChoice::data(serde_json::json!({
                "address": key,
                "property_id": property.id,
            }));
            if let Err(e) = state.orchestrator.resolve(&body.turn_id, choice).await {
                return flow_error_response(&e);
            }
            info!(property_id = %property.id, "Property lookup resolved address turn");
            (StatusCode::OK, Json(serde_json::json!(property)))
        }
        Err(e) => {
            warn!(error = %e, "Property lookup failed");
            state.orchestrator.abort_submission(&body.turn_id).await;
            state.orchestrator.notify(
                NoticeLevel::Error,
                "We couldn't find that address. Please check it and try again.",
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

async fn property_facts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.api.fetch_facts(&id).await {
        Ok(facts) => (StatusCode::OK, Json(serde_json::json!(facts))),
        Err(e) => {
            warn!(property_id = %id, error = %e, "Facts fetch failed");
            state.orchestrator.notify(
                NoticeLevel::Error,
                "Market data is unavailable right now. Please try again.",
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

/// Multipart upload for the condition-photos widget. Fields: `turn_id`
/// (text) and `file`. The upload turn is resolved only after the backend
/// acknowledges the file.
async fn property_upload(
    State(state): State<AppState>,
    Path((id, step)): Path<(String, usize)>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut turn_id: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut bytes: Vec<u8> = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("turn_id") => {
                turn_id = field.text().await.ok();
            }
            Some("file") => {
                filename = field.file_name().map(String::from);
                bytes = field
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .unwrap_or_default();
            }
            _ => {}
        }
    }

    let Some(turn_id) = turn_id else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "Missing turn_id field"})),
        );
    };

    if let Err(e) = validate::validate_upload(filename.as_deref(), bytes.len()) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": e.to_string(), "field": "file"})),
        );
    }
    // Validated non-None just above.
    let filename = filename.unwrap_or_default();

    if let Err(e) = state.orchestrator.begin_submission(&turn_id).await {
        return flow_error_response(&e);
    }

    match state.api.upload_file(&id, step, &filename, bytes).await {
        Ok(ack) => {
            let choice = ResolveChoice::data(serde_json::json!({
                "file_id": ack.file_id,
                "filename": filename,
            }));
            if let Err(e) = state.orchestrator.resolve(&turn_id, choice).await {
                return flow_error_response(&e);
            }
            info!(file_id = %ack.file_id, step, "Upload resolved condition turn");
            (StatusCode::OK, Json(serde_json::json!(ack)))
        }
        Err(e) => {
            warn!(property_id = %id, error = %e, "Upload failed");
            state.orchestrator.abort_submission(&turn_id).await;
            state.orchestrator.notify(
                NoticeLevel::Error,
                "Your photos didn't go through. Please try uploading again.",
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

// ── Auth ────────────────────────────────────────────────────────────────

async fn auth_logout(State(state): State<AppState>) -> impl IntoResponse {
    match state.api.logout().await {
        Ok(()) => {
            state.session.clear().await;
            (StatusCode::OK, Json(serde_json::json!({"status": "logged_out"})))
        }
        Err(e) => {
            warn!(error = %e, "Logout failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
    confirm_password: String,
}

async fn auth_change_password(
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate::validate_change_password(
        &body.current_password,
        &body.new_password,
        &body.confirm_password,
    ) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }

    match state
        .api
        .change_password(&body.current_password, &body.new_password)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "changed"}))),
        Err(e) => {
            warn!(error = %e, "Change password failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
