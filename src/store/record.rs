//! Record references — `table:key` identifiers for rows in the document store.
//!
//! The flat string form (`synthetictexts:abc123`) is the canonical
//! representation outside the store; the structured form carries the table and
//! key separately so store clients can bind references as native record ids.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The local part of a record reference.
///
/// Numeric keys are kept as integers so `widgets:42` addresses the same row
/// whether the key arrived as a number or as the string `"42"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Parse a raw key segment, coercing integral strings to integer keys.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => RecordKey::Int(n),
            Err(_) => RecordKey::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(n) => write!(f, "{n}"),
            RecordKey::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A structured reference to one row: table name plus local key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    table: String,
    key: RecordKey,
}

/// Error for reference strings missing the `table:key` shape.
#[derive(Debug, Error)]
#[error("malformed record reference: {0:?}")]
pub struct MalformedRef(pub String);

impl RecordRef {
    pub fn new(table: impl Into<String>, key: RecordKey) -> Self {
        Self {
            table: table.into(),
            key,
        }
    }

    /// Parse a raw id, qualifying bare keys with `default_table`.
    ///
    /// `"42"` becomes `default_table:42` (integer key); `"widgets:abc"` is
    /// taken as-is. Splits on the first `:` so keys may themselves contain
    /// colons.
    pub fn qualify(raw: &str, default_table: &str) -> Self {
        match raw.split_once(':') {
            Some((table, key)) => Self::new(table, RecordKey::parse(key)),
            None => Self::new(default_table, RecordKey::parse(raw)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

impl FromStr for RecordRef {
    type Err = MalformedRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((table, key)) if !table.is_empty() && !key.is_empty() => {
                Ok(Self::new(table, RecordKey::parse(key)))
            }
            _ => Err(MalformedRef(s.to_string())),
        }
    }
}

impl Serialize for RecordRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualify_adds_table_to_bare_keys() {
        let r = RecordRef::qualify("abc123", "widgets");
        assert_eq!(r.table(), "widgets");
        assert_eq!(r.key(), &RecordKey::Text("abc123".to_string()));
    }

    #[test]
    fn qualify_keeps_qualified_ids() {
        let r = RecordRef::qualify("gadgets:xyz", "widgets");
        assert_eq!(r.table(), "gadgets");
        assert_eq!(r.to_string(), "gadgets:xyz");
    }

    #[test]
    fn numeric_keys_coerce_to_integers() {
        let bare = RecordRef::qualify("42", "widgets");
        let qualified = RecordRef::qualify("widgets:42", "widgets");
        assert_eq!(bare, qualified);
        assert_eq!(bare.key(), &RecordKey::Int(42));
    }

    #[test]
    fn split_uses_first_colon_only() {
        let r = RecordRef::qualify("widgets:a:b", "other");
        assert_eq!(r.table(), "widgets");
        assert_eq!(r.key(), &RecordKey::Text("a:b".to_string()));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let r: RecordRef = "personas:chatty".parse().unwrap();
        assert_eq!(r.to_string(), "personas:chatty");

        assert!("no-colon-here".parse::<RecordRef>().is_err());
        assert!(":missing".parse::<RecordRef>().is_err());
    }

    #[test]
    fn serde_uses_flat_string_form() {
        let r = RecordRef::new("personas", RecordKey::Int(7));
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"personas:7\"");

        let back: RecordRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
