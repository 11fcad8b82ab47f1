//! Ollama-backed model runner.
//!
//! Talks to a local Ollama server over its chat API. Replies are requested
//! unstreamed and surface as a single final event. Each turn carries the
//! whole conversation: the standing instruction, the recorded history, then
//! the new content. Both sides of a completed turn are recorded back into
//! the session store.

use crate::agent::content::{Content, Part, StoredPart};
use crate::agent::runner::{AgentEvent, ModelRunner};
use crate::agent::sessions::{SessionEvent, SessionKey, SessionStore};
use crate::agent::{AgentError, AgentProfile};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OllamaRunner {
    client: reqwest::Client,
    base_url: String,
    sessions: SessionStore,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

impl OllamaRunner {
    pub fn new(base_url: impl Into<String>, sessions: SessionStore) -> OllamaRunner {
        OllamaRunner {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            sessions,
        }
    }

    /// Server version, for connectivity checks.
    pub async fn version(base_url: &str) -> Result<String, AgentError> {
        let response = reqwest::get(format!("{base_url}/api/version"))
            .await
            .map_err(backend_err)?
            .error_for_status()
            .map_err(backend_err)?;
        let body: VersionResponse = response.json().await.map_err(backend_err)?;
        Ok(body.version)
    }
}

fn backend_err(err: reqwest::Error) -> AgentError {
    AgentError::Backend(err.to_string())
}

fn message_from_event(event: &SessionEvent) -> ChatMessage {
    let role = if event.role == "model" { "assistant" } else { "user" };
    let mut text = Vec::new();
    let mut images = Vec::new();
    for part in &event.parts {
        match part {
            StoredPart::Text { text: t } => text.push(t.as_str()),
            StoredPart::Inline { inline_data } => images.push(inline_data.data.clone()),
        }
    }
    ChatMessage {
        role: role.to_string(),
        content: text.join("\n"),
        images: if images.is_empty() { None } else { Some(images) },
    }
}

fn message_from_content(content: &Content) -> ChatMessage {
    let role = if content.role == "model" { "assistant" } else { content.role.as_str() };
    let mut text = Vec::new();
    let mut images = Vec::new();
    for part in &content.parts {
        match part {
            Part::Text(t) => text.push(t.as_str()),
            Part::Blob { data, .. } => images.push(STANDARD.encode(data)),
        }
    }
    ChatMessage {
        role: role.to_string(),
        content: text.join("\n"),
        images: if images.is_empty() { None } else { Some(images) },
    }
}

#[async_trait]
impl ModelRunner for OllamaRunner {
    async fn create_session(&self, key: &SessionKey) -> Result<(), AgentError> {
        self.sessions
            .create_session(key)
            .map(|_| ())
            .map_err(|e| AgentError::Session(e.to_string()))
    }

    async fn run(
        &self,
        model: &str,
        profile: &AgentProfile,
        key: &SessionKey,
        content: Content,
    ) -> Result<mpsc::Receiver<AgentEvent>, AgentError> {
        let mut messages = Vec::new();
        if !profile.instruction.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: profile.instruction.clone(),
                images: None,
            });
        }
        let history = self
            .sessions
            .list_events(key)
            .map_err(|e| AgentError::Session(e.to_string()))?;
        for event in &history {
            messages.push(message_from_event(event));
        }
        messages.push(message_from_content(&content));

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
        };
        tracing::debug!(model, session = %key.session_id, turns = request.messages.len(), "calling ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(backend_err)?
            .error_for_status()
            .map_err(backend_err)?;
        let reply: ChatResponse = response.json().await.map_err(backend_err)?;

        // Record both sides of the turn. History is best effort; the reply
        // still reaches the caller if recording fails.
        let user_parts: Vec<StoredPart> = content.parts.iter().map(StoredPart::from).collect();
        if let Err(err) = self.sessions.append_event(key, "user", "user", &user_parts) {
            tracing::warn!(session = %key.session_id, error = %err, "failed to record user turn");
        }
        let reply_parts = vec![StoredPart::Text {
            text: reply.message.content.clone(),
        }];
        if let Err(err) = self
            .sessions
            .append_event(key, &profile.name, "model", &reply_parts)
        {
            tracing::warn!(session = %key.session_id, error = %err, "failed to record model turn");
        }

        // Unstreamed backend: one buffered final event, then the channel
        // closes when the sender drops here.
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(AgentEvent {
                text: Some(reply.message.content),
                is_final: true,
            })
            .await;
        Ok(rx)
    }
}
