//! Realtime push: every hospital event as a JSON text frame.
//!
//! Browsers cannot set headers on a WebSocket handshake, so the token travels as `?token=`.
//! The stream is one-way; anything the client sends other than close is ignored.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use hms_core::events::HospitalEvent;
use hms_core::HmsError;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: Result<WebSocketUpgrade, axum::extract::ws::rejection::WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let token = params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::from(HmsError::Unauthenticated("No token provided".into())))?;
    let actor = state.ctx.users().authenticate(token)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let events = state.ctx.events().subscribe();
    tracing::info!(user_id = %actor.user_id, role = %actor.role, "realtime client connected");
    Ok(ws.on_upgrade(move |socket| forward(socket, events)))
}

async fn forward(mut socket: WebSocket, mut events: broadcast::Receiver<HospitalEvent>) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let Some(frame) = event_frame(&event) else { continue };
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "realtime client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("realtime client disconnected");
}

fn event_frame(event: &HospitalEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text)),
        Err(err) => {
            tracing::error!(event = %event.event, error = %err, "failed to encode event");
            None
        }
    }
}
