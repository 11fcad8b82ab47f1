//! Document-style filters rendered end to end into SurrealQL statements.

use copydesk::orm::query::{build_count, build_select};
use copydesk::orm::{Filter, FindOptions};
use copydesk::store::BindValue;
use serde_json::json;

fn filter_from(doc: serde_json::Value) -> Filter {
    Filter::from_document(doc.as_object().unwrap())
}

#[test]
fn plain_values_become_equality_tests() {
    let filter = filter_from(json!({"status": "live"}));
    let statement = build_select("widgets", &filter, &FindOptions::default());

    assert_eq!(
        statement.text,
        "SELECT * FROM widgets WHERE status = $status_0"
    );
    assert_eq!(
        statement.params,
        vec![("status_0".to_string(), BindValue::Data(json!("live")))]
    );
}

#[test]
fn operator_documents_group_field_tests() {
    let filter = filter_from(json!({"score": {"$gte": 10, "$lt": 20}}));
    let statement = build_select("widgets", &filter, &FindOptions::default());

    assert_eq!(
        statement.text,
        "SELECT * FROM widgets WHERE (score >= $score_0 AND score < $score_1)"
    );
    assert_eq!(
        statement.params,
        vec![
            ("score_0".to_string(), BindValue::Data(json!(10))),
            ("score_1".to_string(), BindValue::Data(json!(20))),
        ]
    );
}

#[test]
fn or_documents_wrap_each_branch() {
    let filter = filter_from(json!({"$or": [{"status": "a"}, {"archived": true}]}));
    let statement = build_select("widgets", &filter, &FindOptions::default());

    assert_eq!(
        statement.text,
        "SELECT * FROM widgets WHERE ((status = $status_0) OR (archived = $archived_1))"
    );
}

#[test]
fn in_lists_bind_the_whole_array() {
    let filter = filter_from(json!({"tag": {"$in": ["a", "b"]}}));
    let statement = build_select("widgets", &filter, &FindOptions::default());

    assert_eq!(statement.text, "SELECT * FROM widgets WHERE tag INSIDE $tag_0");
    assert_eq!(
        statement.params,
        vec![("tag_0".to_string(), BindValue::Data(json!(["a", "b"])))]
    );
}

#[test]
fn unknown_operators_are_dropped() {
    let filter = filter_from(json!({"score": {"$near": 5}}));
    let statement = build_select("widgets", &filter, &FindOptions::default());

    assert_eq!(statement.text, "SELECT * FROM widgets");
    assert!(statement.params.is_empty());
}

#[test]
fn count_statements_group_all() {
    let filter = filter_from(json!({"status": "live"}));
    let statement = build_count("widgets", &filter);

    assert_eq!(
        statement.text,
        "SELECT count() FROM widgets WHERE status = $status_0 GROUP ALL"
    );
}

#[test]
fn sort_limit_and_skip_render_in_order() {
    let options = FindOptions {
        sort: vec![("created_at".to_string(), -1), ("name".to_string(), 1)],
        limit: Some(10),
        skip: Some(20),
    };
    let statement = build_select("widgets", &Filter::new(), &options);

    assert_eq!(
        statement.text,
        "SELECT * FROM widgets ORDER BY created_at DESC, name ASC LIMIT 10 START 20"
    );
}
