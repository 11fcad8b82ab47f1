//! CLI `doctor` command — check every backing service and print a health report.

use anyhow::Result;

use crate::agent::ollama::OllamaRunner;
use crate::config::CopydeskConfig;
use crate::store::SurrealStore;

/// Probe the record store, the model backend, and the session database.
pub async fn doctor(config: &CopydeskConfig) -> Result<()> {
    println!("Copydesk Health Report");
    println!("======================");
    println!();

    match SurrealStore::connect(&config.store).await {
        Ok(store) => match store.version().await {
            Ok(version) => {
                println!("Record store:      OK (surrealdb {version} at {})", config.store.url)
            }
            Err(err) => println!("Record store:      FAILED ({err})"),
        },
        Err(err) => println!("Record store:      FAILED ({err})"),
    }

    match OllamaRunner::version(&config.agent.ollama_url).await {
        Ok(version) => {
            println!("Model backend:     OK (ollama {version} at {})", config.agent.ollama_url)
        }
        Err(err) => println!("Model backend:     FAILED ({err})"),
    }

    let db_path = config.resolved_sessions_db_path();
    match crate::db::open_database(&db_path) {
        Ok(_) => println!("Session database:  OK ({})", db_path.display()),
        Err(err) => println!("Session database:  FAILED ({err})"),
    }

    println!();
    println!("Configured model:  {}", config.agent.model);
    if let Some(fallback) = config.agent.fallback_model.as_deref() {
        if !fallback.is_empty() {
            println!("Fallback model:    {fallback}");
        }
    }

    Ok(())
}
