//! Generic repository over the store protocol.
//!
//! One repository per entity type. Reads decode through the entity's field
//! declarations; writes encode through them. The repository never interprets
//! row contents itself.

use crate::orm::entity::{decode_row, encode_row, Entity};
use crate::orm::filter::Filter;
use crate::orm::query::{self, FindOptions, Statement};
use crate::store::{BindValue, RecordRef, Row, StoreClient, StoreError};
use rand::Rng;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Repository<E> {
    store: Arc<dyn StoreClient>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Repository {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn StoreClient>) -> Repository<E> {
        Repository {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<E>, StoreError> {
        let Statement { text, params } = query::build_select(E::TABLE, filter, options);
        let rows = self.store.query(&text, params).await?;
        rows.into_iter().map(decode_row).collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<E>, StoreError> {
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        Ok(self.find(filter, &options).await?.into_iter().next())
    }

    pub async fn get(&self, reference: &RecordRef) -> Result<Option<E>, StoreError> {
        match self.store.select(reference).await? {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Fetch by id string. A bare key is qualified with the entity's table,
    /// so `"42"` and `"widgets:42"` address the same row.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.get(&RecordRef::qualify(id, E::TABLE)).await
    }

    /// Insert the entity and write the store-assigned id back into it.
    pub async fn create(&self, entity: &mut E) -> Result<(), StoreError> {
        let row = encode_row(entity)?;
        let stored = self.store.create(E::TABLE, row).await?;
        let created: E = decode_row(stored)?;
        if let Some(id) = created.id() {
            entity.set_id(id.clone());
        }
        Ok(())
    }

    /// Create when the entity has no id, otherwise replace the stored row
    /// wholesale. Replacing a row that no longer exists is an error, not a
    /// silent create.
    pub async fn save(&self, entity: &mut E) -> Result<(), StoreError> {
        let Some(reference) = entity.id().cloned() else {
            return self.create(entity).await;
        };
        let row = encode_row(entity)?;
        match self.store.replace(&reference, row).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::MissingRow {
                reference: reference.to_string(),
            }),
        }
    }

    /// Merge `values` into one record, creating it if absent.
    pub async fn merge(&self, reference: &RecordRef, values: Row) -> Result<Option<E>, StoreError> {
        let Statement { text, mut params } = query::build_merge(values);
        params.push(("record".to_string(), BindValue::Ref(reference.clone())));
        let rows = self.store.query(&text, params).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Apply `values` to every matching row and return the first updated
    /// entity, if any.
    pub async fn update_matching(
        &self,
        values: Row,
        filter: &Filter,
    ) -> Result<Option<E>, StoreError> {
        if values.is_empty() {
            tracing::debug!(table = E::TABLE, "empty update payload, skipping");
            return Ok(None);
        }
        let Statement { text, params } = query::build_update(E::TABLE, values, filter);
        let rows = self.store.query(&text, params).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Delete matching rows. True when at least one row was removed.
    pub async fn delete_matching(&self, filter: &Filter) -> Result<bool, StoreError> {
        let Statement { text, params } = query::build_delete(E::TABLE, filter);
        let rows = self.store.query(&text, params).await?;
        Ok(!rows.is_empty())
    }

    pub async fn delete_all(&self) -> Result<(), StoreError> {
        let Statement { text, params } = query::build_delete_all(E::TABLE);
        self.store.query(&text, params).await?;
        Ok(())
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let Statement { text, params } = query::build_count(E::TABLE, filter);
        let rows = self.store.query(&text, params).await?;
        let total = rows
            .iter()
            .filter_map(|row| row.get("count").and_then(Value::as_u64))
            .sum();
        Ok(total)
    }

    /// Uniform pick across all matching rows, decided on the client so the
    /// distribution does not depend on store ordering.
    pub async fn find_one_random(&self, filter: &Filter) -> Result<Option<E>, StoreError> {
        let mut matches = self.find(filter, &FindOptions::default()).await?;
        if matches.is_empty() {
            return Ok(None);
        }
        let index = rand::thread_rng().gen_range(0..matches.len());
        Ok(Some(matches.swap_remove(index)))
    }
}
