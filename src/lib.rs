//! Schema-driven mapping between flat relational tables and nested tree values.
//!
//! One [`SchemaNode`] tree describes both directions:
//! - [`hydrate()`] joins and groups table rows into records, sequences and
//!   mappings
//! - [`dehydrate()`] walks tree values and emits the rows that hydrate back
//!   into them
//!
//! ```
//! use rowtree::{row, Mapper, RelationalStore};
//!
//! let mapper = Mapper::from_declaration(
//!     "items: list for (c d) (bar c d)
//!     _val_: struct
//!         c: value c
//!         d: value d
//! ",
//! )?;
//! let store = RelationalStore::from_tables([("bar", vec![row([3, 666]), row([6, 1024])])])?;
//! let tree = mapper.hydrate(&store)?;
//! assert!(mapper.dehydrate(&[tree])?.same_rows(&store));
//! # Ok::<(), rowtree::MapperError>(())
//! ```

pub mod cell;
pub mod config;
pub mod dehydrate;
pub mod error;
pub mod hydrate;
pub mod join;
pub mod mapper;
pub mod schema;
pub mod store;
pub mod value;

pub use cell::DeferredCell;
pub use config::{CellRewritePolicy, ConfigError, DanglingKeyPolicy, MapperConfig};
pub use dehydrate::{dehydrate, Dehydrator, PendingStore};
pub use error::{ErrorKind, MapperError, MapperResult};
pub use hydrate::{hydrate, Hydrator};
pub use join::JoinPlan;
pub use mapper::Mapper;
pub use schema::{parse_schema, Join, SchemaNode};
pub use store::{row, RelationalStore, Row, Table};
pub use value::{Datum, Value};
