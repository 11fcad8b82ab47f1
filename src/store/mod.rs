//! Datastore protocol.
//!
//! Provides the [`StoreClient`] trait the ORM layer talks through, the
//! [`BindValue`] union carried by query parameters, and the typed
//! [`StoreError`]. The production implementation is [`surreal::SurrealStore`];
//! tests substitute scripted implementations.

pub mod record;
pub mod surreal;

pub use record::{MalformedRef, RecordKey, RecordRef};
pub use surreal::SurrealStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A value bound to a query parameter or persisted row field.
///
/// References are tagged explicitly by the caller; implementations bind them
/// as native record ids. Plain data passes through as JSON. Nothing is ever
/// inferred from the shape of a string.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Data(Value),
    Ref(RecordRef),
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        BindValue::Data(value)
    }
}

impl From<RecordRef> for BindValue {
    fn from(reference: RecordRef) -> Self {
        BindValue::Ref(reference)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Data(Value::from(value))
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Data(Value::from(value))
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::Data(Value::from(value))
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        BindValue::Data(Value::from(value))
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        BindValue::Data(Value::from(value))
    }
}

/// Named bind parameters for one statement.
pub type Params = Vec<(String, BindValue)>;

/// A row to persist: field names with tagged values, in declaration order.
pub type Row = Vec<(String, BindValue)>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("no row at {reference}")]
    MissingRow { reference: String },
    #[error("malformed record reference: {raw:?}")]
    BadReference { raw: String },
    #[error("row decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<MalformedRef> for StoreError {
    fn from(err: MalformedRef) -> Self {
        StoreError::BadReference { raw: err.0 }
    }
}

/// Protocol the ORM requires of a document store.
///
/// Rows are JSON objects. Record links inside returned rows may arrive either
/// as flat `table:key` strings or as structured `{tb, id}` objects; the row
/// decoder normalizes both. Any store exposing these four calls satisfies the
/// contract.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch one row by reference.
    async fn select(&self, target: &RecordRef) -> Result<Option<Value>, StoreError>;

    /// Insert a row; the store assigns the id. Returns the stored row.
    async fn create(&self, table: &str, row: Row) -> Result<Value, StoreError>;

    /// Replace the full row at `target`. Returns the stored row, or `None`
    /// if no row exists there.
    async fn replace(&self, target: &RecordRef, row: Row) -> Result<Option<Value>, StoreError>;

    /// Run one statement with named bind parameters and return its rows.
    async fn query(&self, statement: &str, params: Params) -> Result<Vec<Value>, StoreError>;
}
