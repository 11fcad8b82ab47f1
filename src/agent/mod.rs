//! Agent orchestration.
//!
//! [`runner`] defines the backend protocol, [`ollama`] implements it against
//! a local Ollama server, [`retry`] drives validated runs across principal
//! and fallback models, [`sessions`] persists conversation history, and
//! [`content`] models message content.

pub mod content;
pub mod ollama;
pub mod retry;
pub mod runner;
pub mod sessions;

pub use retry::RetryPolicy;
pub use runner::{AgentEvent, ModelRunner};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model backend error: {0}")]
    Backend(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("bad attachment: {0}")]
    BadAttachment(String),
}

/// Static description of an agent: who it is, which model answers for it by
/// default, and its standing instruction. Never mutated by a run; models are
/// chosen per attempt.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
}
