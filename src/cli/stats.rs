use anyhow::Result;

use crate::config::CopydeskConfig;
use crate::entities::{Persona, SyntheticText};
use crate::orm::{Filter, FindOptions, Repository};
use crate::store::BindValue;

/// Display store statistics in the terminal.
pub async fn stats(config: &CopydeskConfig) -> Result<()> {
    let store = super::connect_store(config).await?;
    let texts: Repository<SyntheticText> = Repository::new(store.clone());
    let personas: Repository<Persona> = Repository::new(store);

    let everything = Filter::new();
    let text_count = texts.count(&everything).await?;
    let persona_count = personas.count(&everything).await?;

    println!("Copy Store Statistics");
    println!("{}", "=".repeat(40));
    println!("  Synthetic texts:   {text_count}");
    println!("  Personas:          {persona_count}");

    let all_personas = personas.find(&everything, &FindOptions::default()).await?;
    if !all_personas.is_empty() {
        println!();
        println!("By persona:");
        for persona in &all_personas {
            let Some(reference) = persona.id.as_ref() else {
                continue;
            };
            let matching = Filter::new().eq("persona", BindValue::Ref(reference.clone()));
            let count = texts.count(&matching).await?;
            println!("  {:<20} {}", persona.name, count);
        }
    }

    Ok(())
}
