use crate::config::MapperConfig;
use crate::dehydrate::dehydrate;
use crate::error::MapperResult;
use crate::hydrate::hydrate;
use crate::schema::{parse_schema, SchemaNode};
use crate::store::{RelationalStore, Row};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Maps between one schema's tables and its tree values.
///
/// Uses an empty root context: no root variables and a single root row per
/// value. Use [`hydrate`](crate::hydrate()) and [`dehydrate`](crate::dehydrate())
/// directly for bound root variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mapper {
    /// Schema describing both directions
    pub schema: SchemaNode,
    /// Strictness policies
    #[serde(default)]
    pub config: MapperConfig,
}

impl Mapper {
    /// Create a mapper with the default configuration
    pub fn new(schema: SchemaNode) -> Self {
        Self {
            schema,
            config: MapperConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a mapper from the textual declaration language
    pub fn from_declaration(text: &str) -> MapperResult<Self> {
        Ok(Self::new(parse_schema(text)?))
    }

    /// Build the tree described by the schema from `store`
    pub fn hydrate(&self, store: &RelationalStore) -> MapperResult<Value> {
        let mut values = hydrate(&self.schema, store, &[], &[Row::new()], &self.config)?;
        Ok(values.pop().unwrap_or(Value::Absent))
    }

    /// Like [`Mapper::hydrate`], rendered as JSON
    pub fn hydrate_json(&self, store: &RelationalStore) -> MapperResult<JsonValue> {
        Ok(self.hydrate(store)?.to_json())
    }

    /// Produce a fresh store holding the rows of every value
    pub fn dehydrate(&self, values: &[Value]) -> MapperResult<RelationalStore> {
        let roots: Vec<(Row, Value)> = values.iter().map(|v| (Row::new(), v.clone())).collect();
        dehydrate(&self.schema, &[], &roots, &self.config)
    }

    /// Read a JSON document shaped like this mapper's schema
    pub fn read_json(&self, json: &JsonValue) -> MapperResult<Value> {
        Value::from_json(json, &self.schema)
    }
}
