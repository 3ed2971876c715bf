use graph_driver::prelude::*;

#[test]
fn relationship_delete_one_binds_its_id() {
    let stmt = RelationshipDeleteStatements.delete_one(42);
    assert_eq!(stmt.text(), "MATCH (n)-[r]->() WHERE ID(r) = $id DELETE r");
    assert_eq!(stmt.parameters().len(), 1);
    assert_eq!(stmt.parameter("id"), Some(&Value::Int(42)));
    assert!(stmt.unbound_placeholders().is_empty());
}

#[test]
fn delete_many_is_independent_of_iteration_order() {
    let a = RelationshipDeleteStatements.delete_many(vec![7, 3, 5]);
    let b = RelationshipDeleteStatements.delete_many([5, 7, 3, 3]);
    assert_eq!(a, b);
    assert_eq!(a.parameter("ids"), Some(&Value::from(vec![3_i64, 5, 7])));
    assert_eq!(a.placeholders(), vec!["ids"]);
}

#[test]
fn delete_many_with_no_ids_binds_an_empty_list() {
    let stmt = NodeDeleteStatements.delete_many(Vec::<i64>::new());
    assert_eq!(stmt.parameter("ids"), Some(&Value::List(Vec::new())));
    assert!(stmt.ensure_bound().is_ok());
}

#[test]
fn delete_by_label_interpolates_without_parameters() {
    let stmt = RelationshipDeleteStatements.delete_by_label("LIKES");
    assert_eq!(stmt.text(), "MATCH (n)-[r:`LIKES`]-() DELETE r");
    assert!(stmt.parameters().is_empty());
    assert!(stmt.placeholders().is_empty());

    let escaped = NodeDeleteStatements.delete_by_label(&escape_identifier("odd`label"));
    assert!(escaped.text().contains("(n:`odd``label`)"));
}

#[test]
fn builders_are_deterministic() {
    assert_eq!(
        NodeDeleteStatements.delete_one(9),
        NodeDeleteStatements.delete_one(9)
    );
    assert_eq!(
        RelationshipDeleteStatements.purge_all(),
        NodeDeleteStatements.purge_all()
    );
    assert_ne!(
        RelationshipDeleteStatements.delete_one(9).text(),
        NodeDeleteStatements.delete_one(9).text()
    );
}

#[test]
fn quoted_dollars_are_not_placeholders() {
    let stmt = Statement::without_parameters(
        "MATCH (n {name: '$literal'}) // $comment\nWHERE n.x = $x RETURN `$col`",
    );
    assert_eq!(stmt.placeholders(), vec!["x"]);
    let err = stmt.ensure_bound().unwrap_err();
    assert!(err.is_execution());
    assert!(err.to_string().contains("$x"));

    let bound = stmt.with_parameter("x", 1_i64);
    assert!(bound.ensure_bound().is_ok());
}

#[test]
fn values_convert_from_json() {
    let value = Value::from(serde_json::json!({"ids": [1, 2], "name": "a", "ok": true}));
    let Value::Map(map) = value else {
        panic!("expected a map");
    };
    assert_eq!(map["ids"].as_int_list(), Some(vec![1, 2]));
    assert_eq!(map["name"].as_text(), Some("a"));
    assert_eq!(map["ok"].as_bool(), Some(true));
}
