//! Schema trees: data model, validation and the declaration language.

mod node;
pub mod parser;
pub mod validation;

pub use node::{Join, SchemaNode};
pub use parser::parse_schema;
pub use validation::{validate, SchemaValidator};
