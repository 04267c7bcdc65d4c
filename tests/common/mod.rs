//! Common fixtures for the hydration and dehydration tests
//!
//! The `foo`/`bar` tables are the canonical two-level example: every `bar`
//! row may own at most one `foo` row through column `c`.

#![allow(dead_code)]

use rowtree::{row, Datum, Join, RelationalStore, SchemaNode};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment
pub fn init_test_env() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init()
            .unwrap_or(());
    });
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// `foo = [(1,2,3), (4,5,6)]` over `(a, b, c)`, `bar = [(3,666), (6,1024), (42,0)]` over `(c, d)`
pub fn foo_bar_store() -> RelationalStore {
    RelationalStore::from_tables([
        ("foo", vec![row([1, 2, 3]), row([4, 5, 6])]),
        ("bar", vec![row([3, 666]), row([6, 1024]), row([42, 0])]),
    ])
    .expect("Failed to build foo/bar store")
}

/// The record `{a, b}` fetched from `foo` through `c`
pub fn foo_record() -> SchemaNode {
    SchemaNode::record(vec![
        ("a", SchemaNode::scalar("a")),
        ("b", SchemaNode::scalar("b")),
    ])
    .with_join(Join::new("foo", &["a", "b", "c"], &["a", "b"]))
}

/// The record `{c, d, s}` describing one `bar` row
pub fn bar_record() -> SchemaNode {
    SchemaNode::record(vec![
        ("c", SchemaNode::scalar("c")),
        ("d", SchemaNode::scalar("d")),
        ("s", foo_record()),
    ])
}

pub fn bar_join() -> Join {
    Join::new("bar", &["c", "d"], &["c", "d"])
}

/// A sequence over `bar` whose elements carry an optional `foo` record
pub fn foo_bar_schema() -> SchemaNode {
    SchemaNode::sequence(bar_record(), bar_join())
}

/// The same tables as a mapping keyed by `c`
pub fn foo_bar_dict_schema() -> SchemaNode {
    SchemaNode::mapping(SchemaNode::scalar("c"), bar_record(), bar_join())
}

/// Authors with their books, keyed by author id
pub fn library_schema() -> SchemaNode {
    let book = SchemaNode::record(vec![
        ("id", SchemaNode::scalar("bid")),
        ("title", SchemaNode::scalar("title")),
    ]);
    let author = SchemaNode::record(vec![
        ("id", SchemaNode::scalar("aid")),
        ("name", SchemaNode::scalar("name")),
        (
            "books",
            SchemaNode::sequence(
                book,
                Join::new("books", &["aid", "bid", "title"], &["bid", "title"]),
            ),
        ),
    ]);
    SchemaNode::sequence(author, Join::new("authors", &["aid", "name"], &["aid", "name"]))
}

pub fn library_store() -> RelationalStore {
    RelationalStore::from_tables([
        (
            "authors",
            vec![
                vec![Datum::Int(1), Datum::from("Le Guin")],
                vec![Datum::Int(2), Datum::from("Lem")],
            ],
        ),
        (
            "books",
            vec![
                vec![Datum::Int(2), Datum::Int(20), Datum::from("Solaris")],
                vec![Datum::Int(1), Datum::Int(10), Datum::from("The Dispossessed")],
                vec![Datum::Int(1), Datum::Int(11), Datum::from("Earthsea")],
            ],
        ),
    ])
    .expect("Failed to build library store")
}
