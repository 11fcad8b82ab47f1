//! Validated agent runs with principal and fallback phases.
//!
//! A run walks a fixed schedule: N attempts against the principal model,
//! then (when configured) M attempts against a fallback model. Each attempt
//! sends the same content, takes the first final event carrying text, and
//! hands it to the caller's parser. The first reply that parses wins; an
//! exhausted schedule yields `None`. The profile is never modified, so
//! concurrent runs cannot observe each other's model choice.

use crate::agent::content::Content;
use crate::agent::runner::ModelRunner;
use crate::agent::sessions::SessionKey;
use crate::agent::AgentProfile;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Retry schedule for one validated run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts against the principal model.
    pub attempts: u32,
    /// Model to fall back to once principal attempts are exhausted.
    pub fallback_model: Option<String>,
    /// Attempts against the fallback model; inherits `attempts` when unset.
    pub fallback_attempts: Option<u32>,
    /// Pause between attempts within a phase.
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            fallback_model: None,
            fallback_attempts: None,
            pause: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// The `(label, model, attempts)` phases for the given principal model.
    fn phases(&self, principal: &str) -> Vec<(&'static str, String, u32)> {
        let mut phases = vec![("principal", principal.to_string(), self.attempts)];
        if let Some(fallback) = &self.fallback_model {
            phases.push((
                "fallback",
                fallback.clone(),
                self.fallback_attempts.unwrap_or(self.attempts),
            ));
        }
        phases
    }
}

/// Strip markdown code fences from a model reply before JSON parsing.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Run until the model produces a reply that parses into `T` after fence
/// stripping. `None` when every attempt fails.
pub async fn run_with_schema<T: DeserializeOwned>(
    runner: &dyn ModelRunner,
    profile: &AgentProfile,
    policy: &RetryPolicy,
    key: &SessionKey,
    content: Content,
) -> Option<T> {
    drive(runner, profile, policy, key, content, |text| {
        serde_json::from_str(&strip_code_fences(text))
    })
    .await
}

/// Run for free-form text. The first reply carrying any text is returned
/// as-is, unvalidated and unstripped.
pub async fn run_for_text(
    runner: &dyn ModelRunner,
    profile: &AgentProfile,
    policy: &RetryPolicy,
    key: &SessionKey,
    content: Content,
) -> Option<String> {
    drive(runner, profile, policy, key, content, |text| {
        Ok(text.to_string())
    })
    .await
}

async fn drive<T>(
    runner: &dyn ModelRunner,
    profile: &AgentProfile,
    policy: &RetryPolicy,
    key: &SessionKey,
    content: Content,
    parse: impl Fn(&str) -> Result<T, serde_json::Error>,
) -> Option<T> {
    // One session for the whole run. A failure here is tolerated: the
    // backend may already know the session from an earlier run.
    if let Err(err) = runner.create_session(key).await {
        tracing::warn!(session = %key.session_id, error = %err, "session create failed, continuing");
    }

    for (phase, model, attempts) in policy.phases(&profile.model) {
        for attempt in 0..attempts {
            tracing::debug!(phase, model = %model, attempt = attempt + 1, "running attempt");
            match run_once(runner, &model, profile, key, content.clone()).await {
                Some(reply) => match parse(&reply) {
                    Ok(value) => return Some(value),
                    Err(err) => {
                        tracing::warn!(
                            phase,
                            model = %model,
                            attempt = attempt + 1,
                            error = %err,
                            "reply failed validation"
                        );
                    }
                },
                None => {
                    tracing::warn!(phase, model = %model, attempt = attempt + 1, "no usable reply");
                }
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(policy.pause).await;
            }
        }
        tracing::warn!(phase, model = %model, "phase exhausted");
    }
    None
}

/// One attempt: the first final event carrying non-empty text.
async fn run_once(
    runner: &dyn ModelRunner,
    model: &str,
    profile: &AgentProfile,
    key: &SessionKey,
    content: Content,
) -> Option<String> {
    let mut events = match runner.run(model, profile, key, content).await {
        Ok(events) => events,
        Err(err) => {
            tracing::warn!(model = %model, error = %err, "run failed");
            return None;
        }
    };
    while let Some(event) = events.recv().await {
        if event.is_final {
            if let Some(text) = event.text {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}
