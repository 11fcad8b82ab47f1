//! CLI `inspect` command — display one stored record in full.

use anyhow::{bail, Result};

use crate::config::CopydeskConfig;
use crate::entities::{Persona, SyntheticText};
use crate::orm::Repository;

/// Show a single stored text by id, with its persona resolved.
pub async fn inspect(config: &CopydeskConfig, id: &str) -> Result<()> {
    let store = super::connect_store(config).await?;
    let texts: Repository<SyntheticText> = Repository::new(store.clone());

    let Some(record) = texts.get_by_id(id).await? else {
        bail!("no record with id '{id}'");
    };

    let shown_id = record
        .id
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| id.to_string());
    println!("Record: {shown_id}");
    println!("{}", "=".repeat(50));
    println!("  Created:   {}", record.created_at);
    println!("  Updated:   {}", record.updated_at);

    if let Some(ref persona_ref) = record.persona {
        let personas: Repository<Persona> = Repository::new(store);
        match personas.get(persona_ref).await? {
            Some(persona) => println!("  Persona:   {} ({})", persona.name, persona.tone),
            None => println!("  Persona:   {persona_ref} (missing)"),
        }
    }

    println!();
    println!("Text:");
    println!("  {}", record.text);
    Ok(())
}
