//! CLI `generate` command — produce one piece of copy and store it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::agent::content::{part_from_data_url, Content, Part};
use crate::agent::ollama::OllamaRunner;
use crate::agent::retry::run_with_schema;
use crate::agent::sessions::{SessionKey, SessionStore};
use crate::config::CopydeskConfig;
use crate::entities::{Persona, SyntheticText};
use crate::orm::{Filter, Repository};

/// The reply shape requested from the model.
#[derive(Debug, Deserialize)]
struct GeneratedCopy {
    text: String,
}

/// Run one generation, validate the reply, and persist it.
pub async fn generate(
    config: &CopydeskConfig,
    prompt: &str,
    persona: Option<&str>,
    attach: &[String],
) -> Result<()> {
    let store = super::connect_store(config).await?;

    // Resolve the persona first so a typo fails before any model call.
    let personas: Repository<Persona> = Repository::new(store.clone());
    let persona_record = match persona {
        Some(wanted) => Some(resolve_persona(&personas, wanted).await?),
        None => None,
    };

    let db_path = config.resolved_sessions_db_path();
    let conn = crate::db::open_database(&db_path)?;
    let sessions = SessionStore::new(conn);
    let runner = OllamaRunner::new(config.agent.ollama_url.clone(), sessions);

    let mut parts = vec![Part::Text(build_prompt(prompt, persona_record.as_ref()))];
    for url in attach {
        parts.push(part_from_data_url(url).context("bad --attach value")?);
    }

    let profile = config.agent_profile();
    let policy = config.retry_policy();
    let key = SessionKey::new(
        &config.server.app_name,
        "cli",
        &Uuid::now_v7().to_string(),
    );

    let reply: Option<GeneratedCopy> =
        run_with_schema(&runner, &profile, &policy, &key, Content::user(parts)).await;
    let Some(reply) = reply else {
        bail!("no valid reply after all attempts; is ollama running at {}?", config.agent.ollama_url);
    };

    let persona_ref = persona_record.as_ref().and_then(|p| p.id.clone());
    let mut record = SyntheticText::new(reply.text, persona_ref);
    let texts: Repository<SyntheticText> = Repository::new(store);
    texts
        .create(&mut record)
        .await
        .context("failed to store generated copy")?;

    if let Some(reference) = record.id.as_ref() {
        println!("Stored {reference}");
        println!();
    }
    println!("{}", record.text);
    Ok(())
}

/// Look a persona up by record id first, then by exact name.
async fn resolve_persona(personas: &Repository<Persona>, wanted: &str) -> Result<Persona> {
    if let Some(found) = personas.get_by_id(wanted).await? {
        return Ok(found);
    }
    let by_name = personas.find_one(&Filter::new().eq("name", wanted)).await?;
    match by_name {
        Some(found) => Ok(found),
        None => bail!("no persona matching '{wanted}'"),
    }
}

/// Frame the user's brief, folding in the persona voice when one is set.
/// The reply contract mirrors what [`GeneratedCopy`] deserializes.
fn build_prompt(brief: &str, persona: Option<&Persona>) -> String {
    let mut prompt = String::new();
    if let Some(p) = persona {
        prompt.push_str(&format!(
            "Write in the voice of {}: {} Tone: {}.\n\n",
            p.name, p.description, p.tone
        ));
    }
    prompt.push_str(brief);
    prompt.push_str("\n\nReply with a JSON object of the form {\"text\": \"...\"} and nothing else.");
    prompt
}
