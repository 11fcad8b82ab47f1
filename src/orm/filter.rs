//! Filter documents.
//!
//! Filters arrive either as JSON documents in the Mongo dialect
//! (`{"status": "draft", "score": {"$gte": 3}}`, with `$or`/`$and` groups) or
//! through the typed builder. Both produce the same [`Filter`] tree, which
//! [`super::query`] renders to a parameterized WHERE clause. Values are plain
//! data unless the caller tags them as record references; filters never guess
//! at the meaning of a string.

use crate::store::BindValue;
use serde_json::{Map, Value};

/// Comparison operator applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    Regex,
}

impl Op {
    /// Parse a `$`-prefixed operator token. Unknown tokens are `None`;
    /// callers drop them rather than failing the whole filter.
    pub fn from_token(token: &str) -> Option<Op> {
        match token {
            "$eq" => Some(Op::Eq),
            "$ne" => Some(Op::Ne),
            "$gt" => Some(Op::Gt),
            "$gte" => Some(Op::Gte),
            "$lt" => Some(Op::Lt),
            "$lte" => Some(Op::Lte),
            "$in" => Some(Op::In),
            "$nin" => Some(Op::NotIn),
            "$like" => Some(Op::Like),
            "$regex" => Some(Op::Regex),
            _ => None,
        }
    }

    /// The SurrealQL spelling of this operator.
    pub fn as_surql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::In => "INSIDE",
            Op::NotIn => "NOT INSIDE",
            Op::Like => "LIKE",
            Op::Regex => "=~",
        }
    }
}

/// One conjunct of a filter.
#[derive(Debug, Clone)]
pub enum Clause {
    /// Tests against a single field, ANDed together.
    Field {
        field: String,
        tests: Vec<(Op, BindValue)>,
    },
    /// `$and`: every sub-filter must hold.
    All(Vec<Filter>),
    /// `$or`: at least one sub-filter must hold.
    Any(Vec<Filter>),
}

/// A conjunction of clauses. Empty means "match everything".
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub(crate) clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Equality test on `field`.
    pub fn eq(self, field: impl Into<String>, value: impl Into<BindValue>) -> Filter {
        self.cmp(field, Op::Eq, value)
    }

    /// Arbitrary comparison on `field`. Repeated calls for the same field
    /// accumulate into one grouped clause.
    pub fn cmp(mut self, field: impl Into<String>, op: Op, value: impl Into<BindValue>) -> Filter {
        let field = field.into();
        let value = value.into();
        if let Some(Clause::Field { tests, .. }) = self
            .clauses
            .iter_mut()
            .find(|c| matches!(c, Clause::Field { field: f, .. } if *f == field))
        {
            tests.push((op, value));
        } else {
            self.clauses.push(Clause::Field {
                field,
                tests: vec![(op, value)],
            });
        }
        self
    }

    /// `$and` group.
    pub fn all(mut self, branches: Vec<Filter>) -> Filter {
        self.clauses.push(Clause::All(branches));
        self
    }

    /// `$or` group.
    pub fn any(mut self, branches: Vec<Filter>) -> Filter {
        self.clauses.push(Clause::Any(branches));
        self
    }

    /// Ingest a Mongo-dialect filter document.
    ///
    /// Recognized operator tokens map onto [`Op`]; unknown tokens are dropped
    /// with a debug log so a misspelled operator loosens the filter instead of
    /// failing the query. `$or`/`$and` expect an array of sub-documents and
    /// are dropped otherwise. Every value comes through as plain data.
    pub fn from_document(doc: &Map<String, Value>) -> Filter {
        let mut filter = Filter::new();
        for (key, value) in doc {
            match key.as_str() {
                "$or" | "$and" => {
                    let Some(items) = value.as_array() else {
                        tracing::debug!(key = %key, "group operator expects an array, dropping");
                        continue;
                    };
                    let branches: Vec<Filter> = items
                        .iter()
                        .filter_map(|item| match item.as_object() {
                            Some(sub) => Some(Filter::from_document(sub)),
                            None => {
                                tracing::debug!(key = %key, "group branch is not a document, dropping");
                                None
                            }
                        })
                        .collect();
                    if key == "$or" {
                        filter.clauses.push(Clause::Any(branches));
                    } else {
                        filter.clauses.push(Clause::All(branches));
                    }
                }
                _ => match value {
                    Value::Object(ops) => {
                        let mut tests = Vec::new();
                        for (token, operand) in ops {
                            match Op::from_token(token) {
                                Some(op) => tests.push((op, BindValue::Data(operand.clone()))),
                                None => {
                                    tracing::debug!(field = %key, token = %token, "unsupported filter operator, dropping")
                                }
                            }
                        }
                        if !tests.is_empty() {
                            filter.clauses.push(Clause::Field {
                                field: key.clone(),
                                tests,
                            });
                        }
                    }
                    _ => {
                        filter.clauses.push(Clause::Field {
                            field: key.clone(),
                            tests: vec![(Op::Eq, BindValue::Data(value.clone()))],
                        });
                    }
                },
            }
        }
        filter
    }
}
