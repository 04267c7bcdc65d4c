//! Dehydration: tree values to relational rows.
//!
//! Rows are registered with their table as soon as the traversal reaches
//! them, which fixes table order to traversal order. The values of the
//! columns a join introduces are not known yet at that point, so each one
//! starts as an empty [`DeferredCell`]. The scalar leaves fill the cells
//! further down, and a final pass resolves every registered row.

use crate::cell::DeferredCell;
use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::join::JoinPlan;
use crate::schema::{self, Join, SchemaNode};
use crate::store::{RelationalStore, Row};
use crate::value::Value;
use std::collections::{BTreeMap, HashSet};

/// A row of cells in the current scope.
type CellRow = Vec<DeferredCell>;

/// Rows registered during one dehydration pass, before resolution.
#[derive(Debug, Default)]
pub struct PendingStore {
    arities: BTreeMap<String, usize>,
    tables: BTreeMap<String, Vec<CellRow>>,
}

impl PendingStore {
    /// Creates one empty table per `(name, arity)` entry.
    pub fn with_tables(tables: &BTreeMap<String, usize>) -> Self {
        Self {
            arities: tables.clone(),
            tables: tables.keys().map(|name| (name.clone(), Vec::new())).collect(),
        }
    }

    /// Appends a row of cells to a table, keeping registration order.
    pub fn register(&mut self, table: &str, row: CellRow) -> MapperResult<()> {
        let expected = *self
            .arities
            .get(table)
            .ok_or_else(|| MapperError::UnknownTable {
                table: table.to_string(),
            })?;
        if row.len() != expected {
            return Err(MapperError::ArityMismatch {
                table: table.to_string(),
                expected,
                found: row.len(),
            });
        }
        self.tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Number of registered rows across all tables.
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves every cell of every registered row into a store.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedCell` for the first cell that was never written.
    pub fn resolve(self) -> MapperResult<RelationalStore> {
        let mut store = RelationalStore::with_tables(&self.arities);
        for (table, rows) in self.tables {
            for cells in rows {
                let row = cells
                    .iter()
                    .enumerate()
                    .map(|(column, cell)| cell.resolve(&table, column))
                    .collect::<MapperResult<Row>>()?;
                store.append(&table, row)?;
            }
        }
        Ok(store)
    }
}

/// Builds the rows of a fresh store from tree values.
pub struct Dehydrator<'c> {
    config: &'c MapperConfig,
    pending: PendingStore,
}

impl<'c> Dehydrator<'c> {
    pub fn new(config: &'c MapperConfig) -> Self {
        Self {
            config,
            pending: PendingStore::default(),
        }
    }

    /// Dehydrates every `(root row, value)` pair against `schema`.
    ///
    /// All tables the schema references exist in the result, empty or not.
    pub fn dehydrate(
        mut self,
        schema: &SchemaNode,
        root_columns: &[String],
        roots: &[(Row, Value)],
    ) -> MapperResult<RelationalStore> {
        if self.config.validate_schema {
            schema::validate(schema, root_columns)?;
        }
        self.pending = PendingStore::with_tables(&schema.tables()?);

        let mut rows = Vec::with_capacity(roots.len());
        let mut targets = Vec::with_capacity(roots.len());
        for (row, value) in roots {
            if row.len() != root_columns.len() {
                return Err(MapperError::ArityMismatch {
                    table: "<root>".to_string(),
                    expected: root_columns.len(),
                    found: row.len(),
                });
            }
            rows.push(
                root_columns
                    .iter()
                    .zip(row)
                    .map(|(column, datum)| DeferredCell::written(column, datum.clone()))
                    .collect::<CellRow>(),
            );
            targets.push(value);
        }

        self.dehydrate_node(schema, root_columns, &rows, &targets)?;
        let registered = self.pending.len();
        let store = self.pending.resolve()?;
        log::info!(
            "Dehydrated {} root values into {} rows",
            roots.len(),
            registered
        );
        Ok(store)
    }

    fn dehydrate_node(
        &mut self,
        node: &SchemaNode,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        debug_assert_eq!(rows.len(), targets.len());
        match node {
            SchemaNode::Scalar { variable, join } => {
                self.dehydrate_scalar(variable, join.as_ref(), scope, rows, targets)
            }
            SchemaNode::Record { members, join } => {
                self.dehydrate_record(members, join.as_ref(), scope, rows, targets)
            }
            SchemaNode::Sequence { element, join } => {
                self.dehydrate_sequence(element, join, scope, rows, targets)
            }
            SchemaNode::Mapping { key, value, join } => {
                self.dehydrate_mapping(key, value, join, scope, rows, targets)
            }
        }
    }

    /// Extends `parent` with one empty cell per fresh variable and registers
    /// the resulting tuple with the join's table.
    fn allocate(&mut self, plan: &JoinPlan<'_>, parent: &CellRow) -> MapperResult<CellRow> {
        let mut row = parent.clone();
        row.extend(plan.join().fresh.iter().map(|v| DeferredCell::new(v)));
        self.pending.register(plan.table(), plan.project(&row))?;
        Ok(row)
    }

    /// Allocates one row per present target; absent targets contribute none.
    fn allocate_present<'v>(
        &mut self,
        plan: &JoinPlan<'_>,
        rows: &[CellRow],
        targets: &[&'v Value],
    ) -> MapperResult<(Vec<CellRow>, Vec<&'v Value>)> {
        let mut new_rows = Vec::with_capacity(rows.len());
        let mut new_targets = Vec::with_capacity(rows.len());
        for (row, &target) in rows.iter().zip(targets) {
            if target.is_absent() {
                continue;
            }
            new_rows.push(self.allocate(plan, row)?);
            new_targets.push(target);
        }
        Ok((new_rows, new_targets))
    }

    fn dehydrate_scalar(
        &mut self,
        variable: &str,
        join: Option<&Join>,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        if let Some(join) = join {
            let plan = JoinPlan::new(scope, join)?;
            let (rows, targets) = self.allocate_present(&plan, rows, targets)?;
            return self.write_scalars(variable, plan.scope(), &rows, &targets);
        }
        self.write_scalars(variable, scope, rows, targets)
    }

    fn write_scalars(
        &self,
        variable: &str,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        let column = scope
            .iter()
            .position(|v| v == variable)
            .ok_or_else(|| MapperError::unbound_variable(variable, scope))?;
        for (row, target) in rows.iter().zip(targets) {
            match target {
                Value::Scalar(datum) => row[column].write(datum.clone(), self.config.cell_rewrites)?,
                other => return Err(MapperError::shape_mismatch("scalar", other.kind_name())),
            }
        }
        Ok(())
    }

    fn dehydrate_record(
        &mut self,
        members: &[(String, SchemaNode)],
        join: Option<&Join>,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        let plan = join.map(|j| JoinPlan::new(scope, j)).transpose()?;
        let (scope, rows, targets) = match &plan {
            Some(plan) => {
                let (rows, targets) = self.allocate_present(plan, rows, targets)?;
                (plan.scope(), rows, targets)
            }
            None => (scope, rows.to_vec(), targets.to_vec()),
        };

        let mut records = Vec::with_capacity(targets.len());
        for target in &targets {
            match target {
                Value::Record(record) => {
                    if let Some(extra) = record
                        .keys()
                        .find(|k| !members.iter().any(|(name, _)| name == *k))
                    {
                        return Err(MapperError::UnknownMember {
                            member: extra.clone(),
                        });
                    }
                    records.push(record);
                }
                other => return Err(MapperError::shape_mismatch("record", other.kind_name())),
            }
        }

        for (name, member) in members {
            let children = records
                .iter()
                .map(|record| {
                    record.get(name).ok_or_else(|| MapperError::MissingMember {
                        member: name.clone(),
                    })
                })
                .collect::<MapperResult<Vec<&Value>>>()?;
            self.dehydrate_node(member, scope, &rows, &children)?;
        }
        Ok(())
    }

    fn dehydrate_sequence(
        &mut self,
        element: &SchemaNode,
        join: &Join,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        let plan = JoinPlan::new(scope, join)?;
        let mut item_rows = Vec::new();
        let mut items = Vec::new();
        for (row, target) in rows.iter().zip(targets) {
            let list = match target {
                Value::Sequence(list) => list,
                other => return Err(MapperError::shape_mismatch("sequence", other.kind_name())),
            };
            // table order follows the collection's iteration order
            for item in list {
                item_rows.push(self.allocate(&plan, row)?);
                items.push(item);
            }
        }
        self.dehydrate_node(element, plan.scope(), &item_rows, &items)
    }

    fn dehydrate_mapping(
        &mut self,
        key: &SchemaNode,
        value: &SchemaNode,
        join: &Join,
        scope: &[String],
        rows: &[CellRow],
        targets: &[&Value],
    ) -> MapperResult<()> {
        let plan = JoinPlan::new(scope, join)?;
        let mut entry_rows = Vec::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (row, target) in rows.iter().zip(targets) {
            let entries = match target {
                Value::Mapping(entries) => entries,
                other => return Err(MapperError::shape_mismatch("mapping", other.kind_name())),
            };
            let mut seen = HashSet::with_capacity(entries.len());
            for (k, v) in entries {
                if !seen.insert(k) {
                    return Err(MapperError::DuplicateKey {
                        table: join.table.clone(),
                        key: k.to_json().to_string(),
                    });
                }
                entry_rows.push(self.allocate(&plan, row)?);
                keys.push(k);
                values.push(v);
            }
        }
        self.dehydrate_node(key, plan.scope(), &entry_rows, &keys)?;
        self.dehydrate_node(value, plan.scope(), &entry_rows, &values)
    }
}

/// Dehydrates every `(root row, value)` pair into a fresh store.
pub fn dehydrate(
    schema: &SchemaNode,
    root_columns: &[String],
    roots: &[(Row, Value)],
    config: &MapperConfig,
) -> MapperResult<RelationalStore> {
    Dehydrator::new(config).dehydrate(schema, root_columns, roots)
}
