//! Model backend protocol.

use crate::agent::content::Content;
use crate::agent::sessions::SessionKey;
use crate::agent::{AgentError, AgentProfile};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One chunk of model output. Streaming backends send several partial events
/// before the final one; buffering backends send a single final event.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    pub text: Option<String>,
    pub is_final: bool,
}

/// Protocol for a conversational model backend.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// Ensure the session exists. Idempotent; an already-known session is
    /// not an error.
    async fn create_session(&self, key: &SessionKey) -> Result<(), AgentError>;

    /// Run one turn of `content` against `model` under the given profile.
    /// Events arrive on the returned channel, which closes when the turn is
    /// complete. The model is an explicit per-call parameter so callers can
    /// switch models between attempts without touching the profile.
    async fn run(
        &self,
        model: &str,
        profile: &AgentProfile,
        key: &SessionKey,
        content: Content,
    ) -> Result<mpsc::Receiver<AgentEvent>, AgentError>;
}
