//! SurrealQL statement construction.
//!
//! Filters and write payloads render to statement text plus named bind
//! parameters. Every value travels as a parameter; the only tokens spliced
//! into the text are table and field names, which come from entity
//! declarations rather than user data. One renderer carries a single running
//! counter, so a field appearing in both the SET and WHERE halves of an
//! update still gets distinct parameter names.

use crate::orm::filter::{Clause, Filter};
use crate::store::{BindValue, Params, Row};

/// A rendered statement and its bind parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub params: Params,
}

/// Ordering and paging for find queries.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// `(field, direction)` pairs; positive direction sorts ascending.
    pub sort: Vec<(String, i32)>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

struct Renderer {
    params: Params,
    counter: usize,
}

impl Renderer {
    fn new() -> Renderer {
        Renderer {
            params: Vec::new(),
            counter: 0,
        }
    }

    /// Register a bind parameter and return its identifier (without `$`).
    fn push(&mut self, field: &str, value: BindValue) -> String {
        let clean: String = field
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let ident = format!("{clean}_{}", self.counter);
        self.counter += 1;
        self.params.push((ident.clone(), value));
        ident
    }

    fn render_filter(&mut self, filter: &Filter) -> Option<String> {
        let parts: Vec<String> = filter
            .clauses
            .iter()
            .filter_map(|clause| self.render_clause(clause))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        }
    }

    fn render_clause(&mut self, clause: &Clause) -> Option<String> {
        match clause {
            Clause::Field { field, tests } => {
                let mut rendered: Vec<String> = tests
                    .iter()
                    .map(|(op, value)| {
                        let ident = self.push(field, value.clone());
                        format!("{field} {} ${ident}", op.as_surql())
                    })
                    .collect();
                match rendered.len() {
                    0 => None,
                    1 => rendered.pop(),
                    _ => Some(format!("({})", rendered.join(" AND "))),
                }
            }
            Clause::All(branches) => self.render_group(branches, " AND "),
            Clause::Any(branches) => self.render_group(branches, " OR "),
        }
    }

    fn render_group(&mut self, branches: &[Filter], joiner: &str) -> Option<String> {
        let rendered: Vec<String> = branches
            .iter()
            .filter_map(|branch| self.render_filter(branch))
            .map(|sub| format!("({sub})"))
            .collect();
        if rendered.is_empty() {
            None
        } else {
            Some(format!("({})", rendered.join(joiner)))
        }
    }
}

pub fn build_select(table: &str, filter: &Filter, options: &FindOptions) -> Statement {
    let mut renderer = Renderer::new();
    let mut text = format!("SELECT * FROM {table}");
    if let Some(cond) = renderer.render_filter(filter) {
        text.push_str(" WHERE ");
        text.push_str(&cond);
    }
    if !options.sort.is_empty() {
        let order: Vec<String> = options
            .sort
            .iter()
            .map(|(field, direction)| {
                let dir = if *direction > 0 { "ASC" } else { "DESC" };
                format!("{field} {dir}")
            })
            .collect();
        text.push_str(" ORDER BY ");
        text.push_str(&order.join(", "));
    }
    if let Some(limit) = options.limit {
        text.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(skip) = options.skip {
        text.push_str(&format!(" START {skip}"));
    }
    Statement {
        text,
        params: renderer.params,
    }
}

/// `GROUP ALL` collapses the per-row counts to a single row; the caller sums
/// whatever comes back.
pub fn build_count(table: &str, filter: &Filter) -> Statement {
    let mut renderer = Renderer::new();
    let mut text = format!("SELECT count() FROM {table}");
    if let Some(cond) = renderer.render_filter(filter) {
        text.push_str(" WHERE ");
        text.push_str(&cond);
    }
    text.push_str(" GROUP ALL");
    Statement {
        text,
        params: renderer.params,
    }
}

/// `RETURN AFTER` hands back the updated rows so the caller can decode the
/// first one.
pub fn build_update(table: &str, values: Row, filter: &Filter) -> Statement {
    let mut renderer = Renderer::new();
    let assignments: Vec<String> = values
        .into_iter()
        .map(|(field, value)| {
            let ident = renderer.push(&field, value);
            format!("{field} = ${ident}")
        })
        .collect();
    let mut text = format!("UPDATE {table} SET {}", assignments.join(", "));
    if let Some(cond) = renderer.render_filter(filter) {
        text.push_str(" WHERE ");
        text.push_str(&cond);
    }
    text.push_str(" RETURN AFTER");
    Statement {
        text,
        params: renderer.params,
    }
}

/// `RETURN BEFORE` makes the deleted rows observable, so the caller can tell
/// "deleted nothing" from "deleted something".
pub fn build_delete(table: &str, filter: &Filter) -> Statement {
    let mut renderer = Renderer::new();
    let mut text = format!("DELETE FROM {table}");
    if let Some(cond) = renderer.render_filter(filter) {
        text.push_str(" WHERE ");
        text.push_str(&cond);
    }
    text.push_str(" RETURN BEFORE");
    Statement {
        text,
        params: renderer.params,
    }
}

pub fn build_delete_all(table: &str) -> Statement {
    Statement {
        text: format!("DELETE FROM {table}"),
        params: Vec::new(),
    }
}

/// Merge `values` into the record bound at `$record`, creating it if absent.
/// The caller supplies the `record` parameter; values render as an object
/// literal whose every value is bound.
pub fn build_merge(values: Row) -> Statement {
    let mut renderer = Renderer::new();
    let fields: Vec<String> = values
        .into_iter()
        .map(|(field, value)| {
            let ident = renderer.push(&field, value);
            format!("{field}: ${ident}")
        })
        .collect();
    Statement {
        text: format!("UPSERT $record MERGE {{ {} }} RETURN AFTER", fields.join(", ")),
        params: renderer.params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::filter::Op;
    use serde_json::json;

    #[test]
    fn select_without_filter_has_no_where() {
        let stmt = build_select("widgets", &Filter::new(), &FindOptions::default());
        assert_eq!(stmt.text, "SELECT * FROM widgets");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn plain_equality_renders_bare() {
        let filter = Filter::new().eq("status", "draft");
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(stmt.text, "SELECT * FROM widgets WHERE status = $status_0");
        assert_eq!(stmt.params[0].0, "status_0");
    }

    #[test]
    fn two_fields_get_distinct_parameters() {
        let filter = Filter::new().eq("a", 1).eq("b", 2);
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets WHERE a = $a_0 AND b = $b_1"
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn multi_test_field_is_parenthesized() {
        let filter = Filter::new()
            .cmp("score", Op::Gte, 3)
            .cmp("score", Op::Lt, 10);
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets WHERE (score >= $score_0 AND score < $score_1)"
        );
    }

    #[test]
    fn or_group_wraps_branches_and_whole() {
        let filter = Filter::new().any(vec![
            Filter::new().eq("a", 1),
            Filter::new().eq("b", 2),
        ]);
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets WHERE ((a = $a_0) OR (b = $b_1))"
        );
    }

    #[test]
    fn membership_and_pattern_operators_spell_out() {
        let filter = Filter::new()
            .cmp("tag", Op::In, json!(["a", "b"]))
            .cmp("name", Op::Like, "al%")
            .cmp("slug", Op::Regex, "^x")
            .cmp("tier", Op::NotIn, json!([1, 2]));
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets WHERE tag INSIDE $tag_0 \
             AND name LIKE $name_1 AND slug =~ $slug_2 AND tier NOT INSIDE $tier_3"
        );
    }

    #[test]
    fn sort_limit_and_skip_render_in_order() {
        let options = FindOptions {
            sort: vec![("created_at".into(), -1), ("name".into(), 1)],
            limit: Some(5),
            skip: Some(10),
        };
        let stmt = build_select("widgets", &Filter::new(), &options);
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets ORDER BY created_at DESC, name ASC LIMIT 5 START 10"
        );
    }

    #[test]
    fn field_path_is_sanitized_in_parameter_name() {
        let filter = Filter::new().eq("meta.tag", "x");
        let stmt = build_select("widgets", &filter, &FindOptions::default());
        assert_eq!(
            stmt.text,
            "SELECT * FROM widgets WHERE meta.tag = $meta_tag_0"
        );
    }

    #[test]
    fn count_groups_all() {
        let filter = Filter::new().eq("status", "draft");
        let stmt = build_count("widgets", &filter);
        assert_eq!(
            stmt.text,
            "SELECT count() FROM widgets WHERE status = $status_0 GROUP ALL"
        );
    }

    #[test]
    fn update_shares_one_counter_across_set_and_where() {
        let values = vec![("status".to_string(), BindValue::Data(json!("done")))];
        let filter = Filter::new().eq("status", "draft");
        let stmt = build_update("widgets", values, &filter);
        assert_eq!(
            stmt.text,
            "UPDATE widgets SET status = $status_0 WHERE status = $status_1 RETURN AFTER"
        );
        assert_eq!(stmt.params[0].0, "status_0");
        assert_eq!(stmt.params[1].0, "status_1");
    }

    #[test]
    fn delete_returns_before() {
        let filter = Filter::new().eq("status", "stale");
        let stmt = build_delete("widgets", &filter);
        assert_eq!(
            stmt.text,
            "DELETE FROM widgets WHERE status = $status_0 RETURN BEFORE"
        );
    }

    #[test]
    fn delete_all_has_no_clauses() {
        let stmt = build_delete_all("widgets");
        assert_eq!(stmt.text, "DELETE FROM widgets");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn merge_binds_every_value() {
        let values = vec![
            ("status".to_string(), BindValue::Data(json!("done"))),
            ("score".to_string(), BindValue::Data(json!(5))),
        ];
        let stmt = build_merge(values);
        assert_eq!(
            stmt.text,
            "UPSERT $record MERGE { status: $status_0, score: $score_1 } RETURN AFTER"
        );
        assert_eq!(stmt.params.len(), 2);
    }
}
