//! Join key arithmetic shared by hydration and dehydration.
//!
//! A [`JoinPlan`] resolves, once per schema level, where the foreign-key
//! variables sit in the enclosing scope and in the joined table, and where
//! every table column lands in the extended scope. Hydration uses it to
//! expand parent rows with matching table rows; dehydration uses it to
//! project extended rows back onto table tuples.

use crate::config::DanglingKeyPolicy;
use crate::error::{MapperError, MapperResult};
use crate::schema::validation::extend_scope;
use crate::schema::Join;
use crate::store::Row;
use crate::value::Datum;
use std::collections::HashMap;

/// One parent row extended with the fresh values of a matching table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    /// Index of the parent row this row was extended from
    pub origin: usize,
    pub row: Row,
}

/// Precomputed positions for applying one join in one scope.
#[derive(Debug, Clone)]
pub struct JoinPlan<'a> {
    join: &'a Join,
    scope: Vec<String>,
    parent_key: Vec<usize>,
    table_key: Vec<usize>,
    fresh_columns: Vec<usize>,
    projection: Vec<usize>,
}

impl<'a> JoinPlan<'a> {
    /// Plans `join` against the variables bound in `scope`.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a foreign-key column is unbound, a fresh
    /// variable is not a column, or a fresh variable is already bound.
    pub fn new(scope: &[String], join: &'a Join) -> MapperResult<Self> {
        let extended = extend_scope(scope, join)?;

        let mut parent_key = Vec::new();
        let mut table_key = Vec::new();
        for (i, column) in join.columns.iter().enumerate() {
            if join.is_fresh(column) {
                continue;
            }
            table_key.push(i);
            parent_key.push(position(scope, column)?);
        }

        let fresh_columns = join
            .fresh
            .iter()
            .map(|f| position(&join.columns, f))
            .collect::<MapperResult<Vec<_>>>()?;

        let projection = join
            .columns
            .iter()
            .map(|c| position(&extended, c))
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(Self {
            join,
            scope: extended,
            parent_key,
            table_key,
            fresh_columns,
            projection,
        })
    }

    pub fn join(&self) -> &Join {
        self.join
    }

    pub fn table(&self) -> &str {
        &self.join.table
    }

    /// The scope after the join: the enclosing scope followed by `fresh`.
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// The parent's join key, read from a row of the enclosing scope.
    pub fn parent_key<T: Clone>(&self, row: &[T]) -> Vec<T> {
        self.parent_key.iter().map(|&i| row[i].clone()).collect()
    }

    /// The table tuple described by a row of the extended scope.
    pub fn project<T: Clone>(&self, extended_row: &[T]) -> Vec<T> {
        self.projection.iter().map(|&i| extended_row[i].clone()).collect()
    }

    /// Joins the parent `rows` with `table_rows`.
    ///
    /// The result holds one extended row per table row that matched a parent,
    /// in table scan order. A parent may appear any number of times.
    ///
    /// # Errors
    ///
    /// - `DuplicateParentKey` if two parents share one join key
    /// - `ArityMismatch` if a table row has the wrong length
    /// - `DanglingForeignKey` if a table row matches no parent and the
    ///   policy is [`DanglingKeyPolicy::Reject`]
    pub fn expand(
        &self,
        rows: &[Row],
        table_rows: &[Row],
        policy: DanglingKeyPolicy,
    ) -> MapperResult<Vec<Expanded>> {
        let mut index: HashMap<Vec<Datum>, usize> = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let key = self.parent_key(row);
            if index.contains_key(&key) {
                return Err(MapperError::DuplicateParentKey {
                    table: self.join.table.clone(),
                    key: format_key(&key),
                });
            }
            index.insert(key, i);
        }

        let mut expanded = Vec::with_capacity(table_rows.len());
        let mut dropped = 0usize;
        for (i, table_row) in table_rows.iter().enumerate() {
            if table_row.len() != self.join.arity() {
                return Err(MapperError::ArityMismatch {
                    table: self.join.table.clone(),
                    expected: self.join.arity(),
                    found: table_row.len(),
                });
            }
            let key: Vec<Datum> = self.table_key.iter().map(|&k| table_row[k].clone()).collect();
            let origin = match index.get(&key) {
                Some(&origin) => origin,
                None => match policy {
                    DanglingKeyPolicy::Reject => {
                        return Err(MapperError::DanglingForeignKey {
                            table: self.join.table.clone(),
                            row: i,
                            key: format_key(&key),
                        })
                    }
                    DanglingKeyPolicy::Drop => {
                        log::warn!(
                            "Dropping row {} of table '{}': no parent with key {}",
                            i,
                            self.join.table,
                            format_key(&key)
                        );
                        dropped += 1;
                        continue;
                    }
                },
            };
            let mut row = rows[origin].clone();
            row.extend(self.fresh_columns.iter().map(|&f| table_row[f].clone()));
            expanded.push(Expanded { origin, row });
        }

        log::debug!(
            "Joined {} parent rows with table '{}' into {} rows ({} dropped)",
            rows.len(),
            self.join.table,
            expanded.len(),
            dropped
        );
        Ok(expanded)
    }
}

fn position(names: &[String], name: &str) -> MapperResult<usize> {
    names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| MapperError::unbound_variable(name, names))
}

fn format_key(key: &[Datum]) -> String {
    let parts: Vec<String> = key.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}
