//! SurrealDB client behind the [`StoreClient`] protocol.
//!
//! One WebSocket connection, established at startup; the SDK multiplexes
//! operations over it and releases on drop, so per-operation acquisition is
//! plain RAII here.

use crate::config::StoreConfig;
use crate::store::{BindValue, Params, RecordKey, RecordRef, Row, StoreClient, StoreError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{RecordId, Surreal};

/// Store client over the official SurrealDB SDK.
#[derive(Debug, Clone)]
pub struct SurrealStore {
    db: Surreal<Client>,
}

/// Bind-side rendering of a [`BindValue`]: references become native record
/// ids, everything else stays JSON.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SdkValue {
    Ref(RecordId),
    Data(Value),
}

fn to_sdk(value: BindValue) -> SdkValue {
    match value {
        BindValue::Ref(r) => SdkValue::Ref(to_record_id(&r)),
        BindValue::Data(v) => SdkValue::Data(v),
    }
}

fn to_record_id(reference: &RecordRef) -> RecordId {
    match reference.key() {
        RecordKey::Int(n) => RecordId::from_table_key(reference.table(), *n),
        RecordKey::Text(s) => RecordId::from_table_key(reference.table(), s.as_str()),
    }
}

fn store_err(err: surrealdb::Error) -> StoreError {
    StoreError::Query(err.to_string())
}

fn to_content(row: Row) -> BTreeMap<String, SdkValue> {
    row.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

impl SurrealStore {
    /// Connect, authenticate, and select namespace/database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = Surreal::new::<Ws>(config.url.as_str())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        db.signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "store connected"
        );
        Ok(Self { db })
    }

    /// Server version, for connectivity checks.
    pub async fn version(&self) -> Result<String, StoreError> {
        let version = self.db.version().await.map_err(store_err)?;
        Ok(version.to_string())
    }
}

#[async_trait]
impl StoreClient for SurrealStore {
    async fn select(&self, target: &RecordRef) -> Result<Option<Value>, StoreError> {
        let row: Option<Value> = self
            .db
            .select(to_record_id(target))
            .await
            .map_err(store_err)?;
        Ok(row)
    }

    async fn create(&self, table: &str, row: Row) -> Result<Value, StoreError> {
        let created: Option<Value> = self
            .db
            .create(table)
            .content(to_content(row))
            .await
            .map_err(store_err)?;
        created.ok_or_else(|| StoreError::Query(format!("create into {table} returned no row")))
    }

    async fn replace(&self, target: &RecordRef, row: Row) -> Result<Option<Value>, StoreError> {
        let updated: Option<Value> = self
            .db
            .update(to_record_id(target))
            .content(to_content(row))
            .await
            .map_err(store_err)?;
        Ok(updated)
    }

    async fn query(&self, statement: &str, params: Params) -> Result<Vec<Value>, StoreError> {
        let mut query = self.db.query(statement);
        for (name, value) in params {
            query = query.bind((name, to_sdk(value)));
        }
        let mut response = query.await.map_err(store_err)?;
        let rows: Vec<Value> = response.take(0).map_err(store_err)?;
        Ok(rows)
    }
}
