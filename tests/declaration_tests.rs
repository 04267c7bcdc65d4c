use rowtree::{row, Datum, ErrorKind, Mapper, MapperError, RelationalStore, Value};
use serde_json::json;

mod common;
use common::*;

const DEPARTMENT: &str = r#"
# lecturers and the courses they teach
people: dict for (pid name) (Person pid name)
    _key_: value pid
    _val_: struct
        name: value name
        courses: dict for (cid title) (Lecturer pid cid title)
            _key_: value cid
            _val_: value title
"#;

fn department_store() -> RelationalStore {
    RelationalStore::from_tables([
        (
            "Person",
            vec![
                vec![Datum::Int(1), Datum::from("Ada")],
                vec![Datum::Int(2), Datum::from("Alan")],
            ],
        ),
        (
            "Lecturer",
            vec![
                vec![Datum::Int(1), Datum::Int(101), Datum::from("Engines")],
                vec![Datum::Int(2), Datum::Int(202), Datum::from("Computability")],
                vec![Datum::Int(1), Datum::Int(102), Datum::from("Notes")],
            ],
        ),
    ])
    .expect("Failed to build department store")
}

#[test]
fn test_declared_schema_hydrates() {
    init_test_env();
    let mapper = Mapper::from_declaration(DEPARTMENT).unwrap();
    let json = mapper.hydrate_json(&department_store()).unwrap();

    assert_eq!(
        json,
        json!({
            "people": {
                "1": { "name": "Ada", "courses": { "101": "Engines", "102": "Notes" } },
                "2": { "name": "Alan", "courses": { "202": "Computability" } }
            }
        })
    );
}

#[test]
fn test_declared_schema_round_trips() {
    let mapper = Mapper::from_declaration(DEPARTMENT).unwrap();
    let store = department_store();

    let tree = mapper.hydrate(&store).unwrap();
    assert!(mapper.dehydrate(&[tree]).unwrap().same_rows(&store));

    let json = mapper.hydrate_json(&store).unwrap();
    let tree = mapper.read_json(&json).unwrap();
    assert!(mapper.dehydrate(&[tree]).unwrap().same_rows(&store));
}

#[test]
fn test_declared_schema_dehydrates_new_tree() {
    let mapper = Mapper::from_declaration(DEPARTMENT).unwrap();
    let tree = mapper
        .read_json(&json!({
            "people": [
                [3, { "name": "Grace", "courses": [[301, "Compilers"]] }]
            ]
        }))
        .unwrap();
    let store = mapper.dehydrate(&[tree]).unwrap();

    assert_eq!(
        store.rows("Person").unwrap(),
        &[vec![Datum::Int(3), Datum::from("Grace")]][..]
    );
    assert_eq!(
        store.rows("Lecturer").unwrap(),
        &[vec![Datum::Int(3), Datum::Int(301), Datum::from("Compilers")]][..]
    );
}

#[test]
fn test_value_member_with_join() {
    let mapper = Mapper::from_declaration(
        "\
flag: value on for (on) (settings on)
",
    )
    .unwrap();
    let store = RelationalStore::from_tables([("settings", vec![row([true])])]).unwrap();

    assert_eq!(
        mapper.hydrate(&store).unwrap(),
        Value::record([("flag", Value::Scalar(Datum::Bool(true)))])
    );

    let empty = RelationalStore::from_tables([("settings", Vec::new())]).unwrap();
    assert_eq!(
        mapper.hydrate(&empty).unwrap(),
        Value::record([("flag", Value::Absent)])
    );
}

#[test]
fn test_declaration_with_unbound_variable_fails_on_use() {
    let mapper = Mapper::from_declaration(
        "\
xs: list for (x) (t x y)
    _val_: value x
",
    )
    .unwrap();
    let store = RelationalStore::from_tables([("t", vec![row([1, 2])])]).unwrap();
    let err = mapper.hydrate(&store).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(matches!(err, MapperError::UnboundVariable { ref variable, .. } if variable == "y"));
}

#[test]
fn test_malformed_declaration() {
    let err = Mapper::from_declaration("people: dict for (pid) (Person pid\n").unwrap_err();
    assert!(matches!(err, MapperError::Declaration { line: 1, .. }));
}
