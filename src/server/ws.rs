//! WebSocket endpoint — live timeline for both presentation shells.
//!
//! Desktop and mobile render differently but subscribe to the same
//! timeline and wizard events here; the flow logic runs exactly once on
//! the server.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::flow::{NoticeLevel, ResolveChoice};

use super::routes::AppState;

/// Actions a client can send over the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Run the active step's intro chain (idempotent).
    Start,
    /// Resolve an interactive turn.
    Resolve {
        turn_id: String,
        #[serde(default)]
        option_id: Option<String>,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    /// Skip an interactive turn — resolves with the empty sentinel choice.
    Skip { turn_id: String },
    /// Navigate to a step (out-of-range redirects to step 1).
    Goto { step: usize },
    /// Advance to the next step.
    Next,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn sync_frame(state: &AppState) -> Option<String> {
    let status = state.orchestrator.status().await;
    let turns = state.timeline.snapshot().await;
    serde_json::to_string(&serde_json::json!({
        "type": "wizard_sync",
        "step": status.step,
        "step_count": status.step_count,
        "name": status.name,
        "title": status.title,
        "turns": turns,
    }))
    .ok()
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected");

    // Full sync on connect: current step + the whole timeline.
    if let Some(json) = sync_frame(&state).await {
        if socket.send(Message::Text(json.into())).await.is_err() {
            warn!("Failed to send initial sync, client disconnected");
            return;
        }
    }

    let mut timeline_rx = state.timeline.subscribe();
    let mut wizard_rx = state.orchestrator.subscribe();

    loop {
        tokio::select! {
            // Forward timeline events to this client
            result = timeline_rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                debug!("Client disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind timeline — re-syncing");
                        if let Some(json) = sync_frame(&state).await {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Timeline channel closed");
                        break;
                    }
                }
            }

            // Forward wizard events (step changes, notices)
            result = wizard_rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind wizard events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Wizard channel closed");
                        break;
                    }
                }
            }

            // Receive actions from the client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_action(&text, &state).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn handle_client_action(text: &str, state: &AppState) {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(ClientAction::Start) => {
            state.orchestrator.start().await;
        }
        Ok(ClientAction::Resolve {
            turn_id,
            option_id,
            data,
        }) => {
            let choice = ResolveChoice { option_id, data };
            if let Err(e) = state.orchestrator.resolve(&turn_id, choice).await {
                warn!(turn_id = %turn_id, error = %e, "Resolve failed via WS");
                state
                    .orchestrator
                    .notify(NoticeLevel::Warning, "That response couldn't be applied.");
            }
        }
        Ok(ClientAction::Skip { turn_id }) => {
            if let Err(e) = state
                .orchestrator
                .resolve(&turn_id, ResolveChoice::skip())
                .await
            {
                warn!(turn_id = %turn_id, error = %e, "Skip failed via WS");
            }
        }
        Ok(ClientAction::Goto { step }) => {
            state.orchestrator.goto(step).await;
        }
        Ok(ClientAction::Next) => {
            state.orchestrator.next().await;
        }
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
        }
    }
}
