//! Entity declarations and row codecs.
//!
//! An [`Entity`] declares its table, its field names, and which of those
//! fields hold record references. The codecs below are driven entirely by
//! those declarations: decoding keeps declared fields and drops the rest,
//! and reference handling applies only to fields declared as references.

use crate::store::{BindValue, RecordRef, Row, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A persistable document type.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table the entity lives in.
    const TABLE: &'static str;
    /// Payload fields, in declaration order. `id` is implicit.
    const FIELDS: &'static [&'static str];
    /// Subset of [`Self::FIELDS`] holding record references.
    const REF_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Option<&RecordRef>;
    fn set_id(&mut self, id: RecordRef);
}

/// Decode a stored row into an entity.
///
/// Only `id` and declared fields are kept; anything else in the row is
/// dropped with a debug log. Reference fields are normalized to flat
/// `table:key` strings first, since stores return record links either flat
/// or as structured `{tb, id}` objects.
pub fn decode_row<E: Entity>(row: Value) -> Result<E, StoreError> {
    let mut kept = Map::new();
    if let Value::Object(fields) = row {
        for (key, value) in fields {
            let declared = key == "id" || E::FIELDS.contains(&key.as_str());
            if !declared {
                tracing::debug!(table = E::TABLE, field = %key, "dropping undeclared field");
                continue;
            }
            let value = if key == "id" || E::REF_FIELDS.contains(&key.as_str()) {
                flatten_ref(value)
            } else {
                value
            };
            kept.insert(key, value);
        }
    }
    Ok(serde_json::from_value(Value::Object(kept))?)
}

/// Encode an entity into a row for persistence.
///
/// Fields render in declaration order. The id never appears (it is the
/// write target, not payload), null fields are omitted, and declared
/// reference fields are tagged as [`BindValue::Ref`] so the store binds
/// them as native record ids.
pub fn encode_row<E: Entity>(entity: &E) -> Result<Row, StoreError> {
    let encoded = serde_json::to_value(entity)?;
    let Value::Object(mut fields) = encoded else {
        return Ok(Vec::new());
    };
    let mut row = Vec::new();
    for field in E::FIELDS {
        let Some(value) = fields.remove(*field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if E::REF_FIELDS.contains(field) {
            if let Value::String(raw) = value {
                let reference: RecordRef = raw.parse()?;
                row.push(((*field).to_string(), BindValue::Ref(reference)));
                continue;
            }
        }
        row.push(((*field).to_string(), BindValue::Data(value)));
    }
    Ok(row)
}

/// Collapse a structured `{tb, id}` record link to its flat string form.
/// Anything unrecognized passes through untouched; arrays recurse.
fn flatten_ref(value: Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 2 && map.contains_key("tb") && map.contains_key("id") => {
            let table = map.get("tb").and_then(Value::as_str).map(str::to_owned);
            let key = match map.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(Value::Object(inner)) => match (inner.get("String"), inner.get("Number")) {
                    (Some(Value::String(s)), _) => Some(s.clone()),
                    (_, Some(Value::Number(n))) => Some(n.to_string()),
                    _ => None,
                },
                _ => None,
            };
            match (table, key) {
                (Some(table), Some(key)) => Value::String(format!("{table}:{key}")),
                _ => {
                    tracing::debug!("unrecognized record link shape, passing through");
                    Value::Object(map)
                }
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_ref).collect()),
        other => other,
    }
}
