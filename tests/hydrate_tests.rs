use rowtree::{
    hydrate, row, DanglingKeyPolicy, ErrorKind, Join, Mapper, MapperConfig, MapperError,
    RelationalStore, Row, SchemaNode, Value,
};
use serde_json::json;

mod common;
use common::*;

#[test]
fn test_hydrate_foo_bar_in_table_order() {
    init_test_env();
    let mapper = Mapper::new(foo_bar_schema());
    let tree = mapper.hydrate(&foo_bar_store()).unwrap();

    assert_eq!(
        tree.to_json(),
        json!([
            { "c": 3, "d": 666, "s": { "a": 1, "b": 2 } },
            { "c": 6, "d": 1024, "s": { "a": 4, "b": 5 } },
            { "c": 42, "d": 0, "s": null }
        ])
    );
}

#[test]
fn test_unmatched_optional_record_is_absent() {
    let mapper = Mapper::new(foo_bar_schema());
    let tree = mapper.hydrate(&foo_bar_store()).unwrap();

    match tree {
        Value::Sequence(items) => match &items[2] {
            Value::Record(record) => assert_eq!(record.get("s"), Some(&Value::Absent)),
            other => panic!("Expected record, got {:?}", other),
        },
        other => panic!("Expected sequence, got {:?}", other),
    }
}

#[test]
fn test_two_matches_for_single_record_is_ambiguous() {
    let store = RelationalStore::from_tables([
        ("foo", vec![row([1, 2, 3]), row([9, 9, 3])]),
        ("bar", vec![row([3, 666])]),
    ])
    .unwrap();
    let err = Mapper::new(foo_bar_schema()).hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Join);
    assert_eq!(
        err,
        MapperError::AmbiguousRelationship {
            table: "foo".to_string(),
            matches: 2
        }
    );
}

#[test]
fn test_dangling_foreign_key_is_an_error() {
    let store = RelationalStore::from_tables([
        ("foo", vec![row([1, 2, 3]), row([7, 8, 99])]),
        ("bar", vec![row([3, 666])]),
    ])
    .unwrap();
    let err = Mapper::new(foo_bar_schema()).hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Join);
    assert!(matches!(err, MapperError::DanglingForeignKey { ref table, row: 1, .. } if table == "foo"));
}

#[test]
fn test_dangling_rows_can_be_dropped() {
    init_test_env();
    let mut store = foo_bar_store();
    store.append("foo", row([7, 8, 99])).unwrap();
    let config = MapperConfig::new().with_dangling_foreign_keys(DanglingKeyPolicy::Drop);
    let tree = Mapper::new(foo_bar_schema())
        .with_config(config)
        .hydrate(&store)
        .unwrap();

    assert_eq!(tree, Mapper::new(foo_bar_schema()).hydrate(&foo_bar_store()).unwrap());
}

#[test]
fn test_sequence_keeps_table_order() {
    let schema = SchemaNode::sequence(SchemaNode::scalar("c"), bar_join());
    let store = RelationalStore::from_tables([("bar", vec![row([6, 1]), row([42, 2]), row([3, 3])])])
        .unwrap();
    let tree = Mapper::new(schema).hydrate(&store).unwrap();

    assert_eq!(tree.to_json(), json!([6, 42, 3]));
}

#[test]
fn test_nested_sequences_group_by_parent() {
    let tree = Mapper::new(library_schema()).hydrate(&library_store()).unwrap();

    assert_eq!(
        tree.to_json(),
        json!([
            {
                "id": 1,
                "name": "Le Guin",
                "books": [
                    { "id": 10, "title": "The Dispossessed" },
                    { "id": 11, "title": "Earthsea" }
                ]
            },
            {
                "id": 2,
                "name": "Lem",
                "books": [{ "id": 20, "title": "Solaris" }]
            }
        ])
    );
}

#[test]
fn test_parent_without_children_gets_empty_sequence() {
    let mut store = library_store();
    store.append("authors", row(vec![rowtree::Datum::Int(3), "Borges".into()])).unwrap();
    let tree = Mapper::new(library_schema()).hydrate(&store).unwrap();

    assert_eq!(tree.to_json()[2]["books"], json!([]));
}

#[test]
fn test_mapping_keys_in_table_order() {
    let tree = Mapper::new(foo_bar_dict_schema())
        .hydrate(&foo_bar_store())
        .unwrap();

    match tree {
        Value::Mapping(entries) => {
            let keys: Vec<Value> = entries.iter().map(|(k, _)| k.clone()).collect();
            assert_eq!(keys, vec![Value::from(3), Value::from(6), Value::from(42)]);
        }
        other => panic!("Expected mapping, got {:?}", other),
    }
}

#[test]
fn test_duplicate_mapping_key_is_an_error() {
    let schema = SchemaNode::mapping(SchemaNode::scalar("d"), SchemaNode::scalar("c"), bar_join());
    let store = RelationalStore::from_tables([("bar", vec![row([1, 5]), row([2, 5])])]).unwrap();
    let err = Mapper::new(schema).hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert!(matches!(err, MapperError::DuplicateKey { ref table, .. } if table == "bar"));
}

#[test]
fn test_root_rows_bind_foreign_keys() {
    let schema = SchemaNode::sequence(
        SchemaNode::scalar("pet"),
        Join::new("pets", &["owner", "pet"], &["pet"]),
    );
    let store = RelationalStore::from_tables([(
        "pets",
        vec![row(["1", "rex"]), row(["2", "tom"]), row(["1", "fido"])],
    )])
    .unwrap();
    let roots: Vec<Row> = vec![row(["1"]), row(["2"])];

    let values = hydrate(&schema, &store, &strings(&["owner"]), &roots, &MapperConfig::default()).unwrap();

    assert_eq!(values.len(), 2);
    assert_eq!(values[0].to_json(), json!(["rex", "fido"]));
    assert_eq!(values[1].to_json(), json!(["tom"]));
}

#[test]
fn test_joined_scalar_reads_single_value() {
    let schema = SchemaNode::record(vec![
        ("c", SchemaNode::scalar("c")),
        (
            "a",
            SchemaNode::scalar("a").with_join(Join::new("foo", &["a", "b", "c"], &["a", "b"])),
        ),
    ]);
    let schema = SchemaNode::sequence(schema, bar_join());
    let tree = Mapper::new(schema).hydrate(&foo_bar_store()).unwrap();

    assert_eq!(
        tree.to_json(),
        json!([
            { "c": 3, "a": 1 },
            { "c": 6, "a": 4 },
            { "c": 42, "a": null }
        ])
    );
}

#[test]
fn test_missing_table_is_a_schema_error() {
    let store = RelationalStore::from_tables([("bar", vec![row([3, 666])])]).unwrap();
    let err = Mapper::new(foo_bar_schema()).hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(matches!(err, MapperError::UnknownTable { ref table } if table == "foo"));
}

#[test]
fn test_invalid_schema_is_rejected_before_reading() {
    let schema = SchemaNode::sequence(SchemaNode::scalar("x"), bar_join());
    let err = Mapper::new(schema).hydrate(&foo_bar_store()).unwrap_err();

    assert!(matches!(err, MapperError::UnboundVariable { ref variable, .. } if variable == "x"));
}

fn joined_scalar_list() -> SchemaNode {
    SchemaNode::sequence(
        SchemaNode::scalar("a").with_join(Join::new("foo", &["a", "c"], &["a"])),
        Join::new("bar", &["c"], &["c"]),
    )
}

#[test]
fn test_joined_scalar_element_keeps_one_item_per_row() {
    let store = RelationalStore::from_tables([
        ("bar", vec![row([3]), row([6])]),
        ("foo", vec![row([1, 3])]),
    ])
    .unwrap();
    let tree = Mapper::new(joined_scalar_list()).hydrate(&store).unwrap();

    assert_eq!(tree, Value::Sequence(vec![Value::from(1), Value::Absent]));
}

#[test]
fn test_joined_scalar_element_fan_out_is_ambiguous() {
    let store = RelationalStore::from_tables([
        ("bar", vec![row([3]), row([6])]),
        ("foo", vec![row([1, 3]), row([2, 3])]),
    ])
    .unwrap();
    let err = Mapper::new(joined_scalar_list()).hydrate(&store).unwrap_err();

    assert_eq!(
        err,
        MapperError::AmbiguousRelationship {
            table: "foo".to_string(),
            matches: 2
        }
    );
}

#[test]
fn test_joined_scalar_member_fan_out_is_ambiguous() {
    let schema = SchemaNode::sequence(
        SchemaNode::record(vec![
            ("c", SchemaNode::scalar("c")),
            (
                "a",
                SchemaNode::scalar("a").with_join(Join::new("foo", &["a", "b", "c"], &["a", "b"])),
            ),
        ]),
        bar_join(),
    );
    let mut store = foo_bar_store();
    store.append("foo", row([7, 8, 3])).unwrap();
    let err = Mapper::new(schema).hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Join);
    assert_eq!(
        err,
        MapperError::AmbiguousRelationship {
            table: "foo".to_string(),
            matches: 2
        }
    );
}

#[test]
fn test_same_mapping_key_under_different_parents() {
    let author = SchemaNode::record(vec![
        ("id", SchemaNode::scalar("aid")),
        (
            "books",
            SchemaNode::mapping(
                SchemaNode::scalar("bid"),
                SchemaNode::scalar("title"),
                Join::new("books", &["aid", "bid", "title"], &["bid", "title"]),
            ),
        ),
    ]);
    let schema = SchemaNode::sequence(author, Join::new("authors", &["aid"], &["aid"]));
    let store = RelationalStore::from_tables([
        ("authors", vec![row([1]), row([2])]),
        (
            "books",
            vec![
                vec![rowtree::Datum::Int(1), rowtree::Datum::Int(10), "Earthsea".into()],
                vec![rowtree::Datum::Int(2), rowtree::Datum::Int(10), "Solaris".into()],
            ],
        ),
    ])
    .unwrap();
    let tree = Mapper::new(schema).hydrate(&store).unwrap();

    assert_eq!(
        tree.to_json(),
        json!([
            { "id": 1, "books": { "10": "Earthsea" } },
            { "id": 2, "books": { "10": "Solaris" } }
        ])
    );
}
