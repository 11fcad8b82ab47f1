//! HTTP and WebSocket chat server.
//!
//! Routes:
//! - `GET /health` — liveness probe
//! - `WS /ws/create_session/{client_id}` — mints a session id for the client
//! - `WS /ws/{client_id}/{session_id}` — one chat conversation
//! - `GET /session_history/{user_id}/{session_id}` — recorded events
//!
//! The wire protocol is JSON messages tagged by `type`. Inbound: `text`
//! (plain string data) and `image` (base64 data with optional prompt).
//! Outbound: `status`, `message_part`, `message_end`, `session_created`,
//! and `error`. Final message parts additionally carry `speech_text`, the
//! reply flattened for synthesis.

use crate::agent::content::{Content, Part};
use crate::agent::runner::ModelRunner;
use crate::agent::sessions::{SessionKey, SessionStore};
use crate::agent::AgentProfile;
use crate::config::CopydeskConfig;
use crate::speech::clean_for_speech;
use anyhow::Result;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CopydeskConfig>,
    pub runner: Arc<dyn ModelRunner>,
    pub sessions: SessionStore,
    pub profile: AgentProfile,
}

impl AppState {
    pub fn new(
        config: Arc<CopydeskConfig>,
        runner: Arc<dyn ModelRunner>,
        sessions: SessionStore,
    ) -> AppState {
        let profile = config.agent_profile();
        AppState {
            config,
            runner,
            sessions,
            profile,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    SessionCreated {
        session_id: String,
    },
    Status {
        message: String,
    },
    MessagePart {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        speech_text: Option<String>,
        is_final: bool,
    },
    MessageEnd,
    Error {
        message: String,
    },
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws/create_session/{client_id}", any(create_session_ws))
        .route("/ws/{client_id}/{session_id}", any(chat_ws))
        .route("/session_history/{user_id}/{session_id}", get(session_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(state: AppState) -> Result<()> {
    let bind_addr = state.config.server.bind_addr();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "chat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down chat server");
        })
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(())
}

async fn create_session_ws(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_create_session(socket, client_id, state))
}

async fn handle_create_session(mut socket: WebSocket, client_id: String, state: AppState) {
    let session_id = Uuid::now_v7().to_string();
    let key = SessionKey::new(&state.config.server.app_name, &client_id, &session_id);

    // Tolerated: the backend may already know the session.
    if let Err(err) = state.runner.create_session(&key).await {
        tracing::warn!(client = %client_id, error = %err, "session create failed, continuing");
    }

    tracing::info!(client = %client_id, session = %session_id, "session created");
    let created = ServerMessage::SessionCreated {
        session_id: session_id.clone(),
    };
    if let Err(err) = send_message(&mut socket, &created).await {
        tracing::error!(client = %client_id, session = %session_id, error = %err, "failed to deliver session id");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::ERROR,
                reason: "Session creation failed".into(),
            })))
            .await;
    }
}

async fn chat_ws(
    ws: WebSocketUpgrade,
    Path((client_id, session_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat(socket, client_id, session_id, state))
}

async fn handle_chat(
    mut socket: WebSocket,
    client_id: String,
    session_id: String,
    state: AppState,
) {
    tracing::info!(client = %client_id, session = %session_id, "chat client connected");
    let key = SessionKey::new(&state.config.server.app_name, &client_id, &session_id);

    // The client may connect straight to a fresh id; make sure the session
    // exists before the first turn.
    if let Err(err) = state.runner.create_session(&key).await {
        tracing::warn!(session = %session_id, error = %err, "session setup failed, continuing");
    }

    let connected = ServerMessage::Status {
        message: "Agent service connected".to_string(),
    };
    if send_message(&mut socket, &connected).await.is_err() {
        return;
    }

    while let Some(received) = socket.recv().await {
        let raw = match received {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::info!(client = %client_id, error = %err, "chat client disconnected");
                break;
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(client = %client_id, error = %err, "unparseable client message");
                let reply = ServerMessage::Error {
                    message: "Invalid JSON message.".to_string(),
                };
                let _ = send_message(&mut socket, &reply).await;
                continue;
            }
        };

        let parts = match build_parts(&parsed) {
            Ok(parts) => parts,
            Err(message) => {
                tracing::warn!(client = %client_id, reason = %message, "rejected client message");
                let _ = send_message(&mut socket, &ServerMessage::Error { message }).await;
                continue;
            }
        };
        if parts.is_empty() {
            let _ = send_message(&mut socket, &ServerMessage::MessageEnd).await;
            continue;
        }

        let content = Content::user(parts);
        let mut events = match state
            .runner
            .run(&state.profile.model, &state.profile, &key, content)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(session = %session_id, error = %err, "agent run failed");
                let reply = ServerMessage::Error {
                    message: "An unexpected error occurred with the agent.".to_string(),
                };
                let _ = send_message(&mut socket, &reply).await;
                break;
            }
        };

        while let Some(event) = events.recv().await {
            let Some(text) = event.text else { continue };
            if !event.is_final && text.is_empty() {
                continue;
            }
            let speech_text = if event.is_final {
                let cleaned = clean_for_speech(&text);
                if cleaned.is_empty() { None } else { Some(cleaned) }
            } else {
                None
            };
            let part = ServerMessage::MessagePart {
                text,
                speech_text,
                is_final: event.is_final,
            };
            if send_message(&mut socket, &part).await.is_err() {
                tracing::info!(client = %client_id, "client left mid-reply");
                return;
            }
        }

        let _ = send_message(&mut socket, &ServerMessage::MessageEnd).await;
    }

    tracing::info!(client = %client_id, session = %session_id, "chat connection closed");
}

/// Turn one inbound client message into content parts. The error string is
/// sent back to the client verbatim.
fn build_parts(message: &Value) -> Result<Vec<Part>, String> {
    match message.get("type").and_then(Value::as_str) {
        Some("text") => {
            let Some(data) = message.get("data").and_then(Value::as_str) else {
                return Err("Invalid text payload.".to_string());
            };
            Ok(vec![Part::Text(data.to_string())])
        }
        Some("image") => {
            let mime_type = message
                .get("mime_type")
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            let prompt = message.get("prompt").and_then(Value::as_str).unwrap_or("");
            let Some(data) = message.get("data").and_then(Value::as_str) else {
                return Err("Invalid image payload (expected base64 string).".to_string());
            };
            let bytes = STANDARD
                .decode(data)
                .map_err(|_| "Invalid base64 image data.".to_string())?;
            let mut parts = Vec::new();
            if !prompt.is_empty() {
                parts.push(Part::Text(prompt.to_string()));
            }
            parts.push(Part::Blob {
                mime_type: mime_type.to_string(),
                data: bytes,
            });
            Ok(parts)
        }
        other => Err(format!("Unknown message type: {}", other.unwrap_or("none"))),
    }
}

async fn session_history(
    Path((user_id, session_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<Value>, StatusCode> {
    let key = SessionKey::new(&state.config.server.app_name, &user_id, &session_id);
    let events = state.sessions.list_events(&key).map_err(|err| {
        tracing::error!(session = %session_id, error = %err, "history load failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let history: Vec<Value> = events
        .into_iter()
        .map(|event| {
            json!({
                "author": event.author,
                "content": { "parts": event.parts, "role": event.role },
                "id": event.uid,
            })
        })
        .collect();
    Ok(Json(json!({ "events": history })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_messages_have_the_wire_shapes() {
        let created = ServerMessage::SessionCreated {
            session_id: "s1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            json!({"type": "session_created", "session_id": "s1"})
        );

        let part = ServerMessage::MessagePart {
            text: "hello".to_string(),
            speech_text: None,
            is_final: false,
        };
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"type": "message_part", "text": "hello", "is_final": false})
        );

        let final_part = ServerMessage::MessagePart {
            text: "**hi**".to_string(),
            speech_text: Some("hi".to_string()),
            is_final: true,
        };
        assert_eq!(
            serde_json::to_value(&final_part).unwrap(),
            json!({
                "type": "message_part",
                "text": "**hi**",
                "speech_text": "hi",
                "is_final": true
            })
        );

        assert_eq!(
            serde_json::to_value(ServerMessage::MessageEnd).unwrap(),
            json!({"type": "message_end"})
        );
    }

    #[test]
    fn text_messages_need_string_data() {
        let parts = build_parts(&json!({"type": "text", "data": "hello"})).unwrap();
        assert_eq!(parts, vec![Part::Text("hello".to_string())]);

        let err = build_parts(&json!({"type": "text", "data": 42})).unwrap_err();
        assert_eq!(err, "Invalid text payload.");
    }

    #[test]
    fn image_messages_default_mime_and_prepend_prompt() {
        let parts = build_parts(&json!({
            "type": "image",
            "data": "aGVsbG8=",
            "prompt": "describe this",
        }))
        .unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Part::Text("describe this".to_string()));
        assert!(matches!(
            &parts[1],
            Part::Blob { mime_type, data } if mime_type == "image/png" && data == b"hello"
        ));
    }

    #[test]
    fn image_messages_reject_bad_payloads() {
        let err = build_parts(&json!({"type": "image", "data": 42})).unwrap_err();
        assert_eq!(err, "Invalid image payload (expected base64 string).");

        let err = build_parts(&json!({"type": "image", "data": "not!!base64"})).unwrap_err();
        assert_eq!(err, "Invalid base64 image data.");
    }

    #[test]
    fn unknown_types_are_named_in_the_error() {
        let err = build_parts(&json!({"type": "voice", "data": "x"})).unwrap_err();
        assert_eq!(err, "Unknown message type: voice");

        let err = build_parts(&json!({"data": "x"})).unwrap_err();
        assert_eq!(err, "Unknown message type: none");
    }
}
