use crate::error::{MapperError, MapperResult};
use crate::value::Datum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fixed-arity tuple of a table.
pub type Row = Vec<Datum>;

/// Builds a row from anything convertible into datums.
pub fn row<I, D>(values: I) -> Row
where
    I: IntoIterator<Item = D>,
    D: Into<Datum>,
{
    values.into_iter().map(Into::into).collect()
}

/// An ordered collection of rows sharing one arity.
///
/// The arity is fixed at creation or by the first append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    arity: Option<usize>,
    rows: Vec<Row>,
}

impl Table {
    pub fn with_arity(arity: usize) -> Self {
        Self {
            arity: Some(arity),
            rows: Vec::new(),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

/// Named tables of fixed-arity tuples.
///
/// Rows keep the order in which they were appended. The store is passed
/// explicitly to every operation and never shared implicitly.
///
/// Serialized as a map from table name to a list of rows. Deserializing
/// goes through [`RelationalStore::from_tables`], so mixed row lengths are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<Row>>",
    into = "BTreeMap<String, Vec<Row>>"
)]
pub struct RelationalStore {
    tables: BTreeMap<String, Table>,
}

impl RelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one empty table per `(name, arity)` entry.
    pub fn with_tables(tables: &BTreeMap<String, usize>) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|(name, arity)| (name.clone(), Table::with_arity(*arity)))
                .collect(),
        }
    }

    /// Creates a store from `(name, rows)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `ArityMismatch` if the rows of one table differ in length.
    pub fn from_tables<I, S>(tables: I) -> MapperResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<Row>)>,
        S: Into<String>,
    {
        let mut store = Self::new();
        for (name, rows) in tables {
            let name = name.into();
            store.tables.entry(name.clone()).or_default();
            for r in rows {
                store.append(&name, r)?;
            }
        }
        Ok(store)
    }

    /// Ensures a table exists with the given arity.
    pub fn create_table(&mut self, name: &str, arity: usize) -> MapperResult<()> {
        let table = self.tables.entry(name.to_string()).or_default();
        match table.arity {
            Some(expected) if expected != arity => Err(MapperError::ArityMismatch {
                table: name.to_string(),
                expected,
                found: arity,
            }),
            _ => {
                table.arity = Some(arity);
                Ok(())
            }
        }
    }

    /// All rows of a table, in store order.
    pub fn rows(&self, name: &str) -> MapperResult<&[Row]> {
        self.tables
            .get(name)
            .map(Table::rows)
            .ok_or_else(|| MapperError::UnknownTable {
                table: name.to_string(),
            })
    }

    /// Appends a row to an existing table.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` if the table was never created and
    /// `ArityMismatch` if the row's length differs from the table's arity.
    pub fn append(&mut self, name: &str, row: Row) -> MapperResult<()> {
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| MapperError::UnknownTable {
                table: name.to_string(),
            })?;
        match table.arity {
            Some(expected) if expected != row.len() => {
                return Err(MapperError::ArityMismatch {
                    table: name.to_string(),
                    expected,
                    found: row.len(),
                })
            }
            Some(_) => {}
            None => table.arity = Some(row.len()),
        }
        table.rows.push(row);
        Ok(())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(String::as_str)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Total number of rows across all tables.
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compares two stores table by table as multisets of rows.
    pub fn same_rows(&self, other: &RelationalStore) -> bool {
        if !self.tables.keys().eq(other.tables.keys()) {
            return false;
        }
        self.tables.iter().all(|(name, table)| {
            let mut mine = table.rows.clone();
            let mut theirs = other.tables[name].rows.clone();
            mine.sort();
            theirs.sort();
            mine == theirs
        })
    }
}

impl TryFrom<BTreeMap<String, Vec<Row>>> for RelationalStore {
    type Error = MapperError;

    fn try_from(tables: BTreeMap<String, Vec<Row>>) -> MapperResult<Self> {
        Self::from_tables(tables)
    }
}

impl From<RelationalStore> for BTreeMap<String, Vec<Row>> {
    fn from(store: RelationalStore) -> Self {
        store
            .tables
            .into_iter()
            .map(|(name, table)| (name, table.rows))
            .collect()
    }
}
