//! Terminal commands for operating the copy store.

pub mod doctor;
pub mod generate;
pub mod inspect;
pub mod list;
pub mod sample;
pub mod stats;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::CopydeskConfig;
use crate::store::{StoreClient, SurrealStore};

/// Connect to the record store configured under `[store]`.
pub async fn connect_store(config: &CopydeskConfig) -> Result<Arc<dyn StoreClient>> {
    let store = SurrealStore::connect(&config.store)
        .await
        .with_context(|| format!("failed to connect to record store at {}", config.store.url))?;
    Ok(Arc::new(store))
}
