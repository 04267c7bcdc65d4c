//! Hydration: relational rows to tree values.
//!
//! The schema is walked top-down once. At every level the whole set of
//! active rows is processed together, so fan-out is handled by iteration
//! and recursion depth follows the schema, not the data.
//!
//! Every handler receives parallel `rows` and `targets` and returns
//! `(target, value)` pairs in row order. Targets are indices into whatever
//! the caller is filling in: record slots, list slots or root results.

use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::join::JoinPlan;
use crate::schema::{self, Join, SchemaNode};
use crate::store::{RelationalStore, Row};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Rows after an optional join, tagged with the parent each came from.
struct Context<'r> {
    scope: Cow<'r, [String]>,
    rows: Cow<'r, [Row]>,
    origins: Vec<usize>,
}

/// Builds tree values from the rows of one store.
pub struct Hydrator<'s> {
    store: &'s RelationalStore,
    config: &'s MapperConfig,
}

impl<'s> Hydrator<'s> {
    pub fn new(store: &'s RelationalStore, config: &'s MapperConfig) -> Self {
        Self { store, config }
    }

    /// Hydrates `schema` once per root row.
    ///
    /// Returns one value per root row, in root order.
    pub fn hydrate(
        &self,
        schema: &SchemaNode,
        root_columns: &[String],
        root_rows: &[Row],
    ) -> MapperResult<Vec<Value>> {
        if self.config.validate_schema {
            schema::validate(schema, root_columns)?;
        }
        if let Some(bad) = root_rows.iter().find(|r| r.len() != root_columns.len()) {
            return Err(MapperError::ArityMismatch {
                table: "<root>".to_string(),
                expected: root_columns.len(),
                found: bad.len(),
            });
        }

        let targets: Vec<usize> = (0..root_rows.len()).collect();
        let pairs = self.hydrate_node(schema, root_columns, root_rows, &targets)?;
        let mut slots = collect_single(pairs, root_rows.len(), schema.join())?;
        let values: Vec<Value> = slots
            .iter_mut()
            .map(|slot| slot.take().unwrap_or(Value::Absent))
            .collect();

        log::info!(
            "Hydrated {} root values from {} stored rows",
            values.len(),
            self.store.len()
        );
        Ok(values)
    }

    fn hydrate_node(
        &self,
        node: &SchemaNode,
        scope: &[String],
        rows: &[Row],
        targets: &[usize],
    ) -> MapperResult<Vec<(usize, Value)>> {
        debug_assert_eq!(rows.len(), targets.len());
        match node {
            SchemaNode::Scalar { variable, join } => {
                self.hydrate_scalar(variable, join.as_ref(), scope, rows, targets)
            }
            SchemaNode::Record { members, join } => {
                self.hydrate_record(members, join.as_ref(), scope, rows, targets)
            }
            SchemaNode::Sequence { element, join } => {
                self.hydrate_sequence(element, join, scope, rows, targets)
            }
            SchemaNode::Mapping { key, value, join } => {
                self.hydrate_mapping(key, value, join, scope, rows, targets)
            }
        }
    }

    fn expand<'r>(
        &self,
        join: Option<&Join>,
        scope: &'r [String],
        rows: &'r [Row],
    ) -> MapperResult<Context<'r>> {
        let join = match join {
            Some(join) => join,
            None => {
                return Ok(Context {
                    scope: Cow::Borrowed(scope),
                    rows: Cow::Borrowed(rows),
                    origins: (0..rows.len()).collect(),
                })
            }
        };
        let plan = JoinPlan::new(scope, join)?;
        let table_rows = self.store.rows(&join.table)?;
        let expanded = plan.expand(rows, table_rows, self.config.dangling_foreign_keys)?;

        let mut origins = Vec::with_capacity(expanded.len());
        let mut extended = Vec::with_capacity(expanded.len());
        for e in expanded {
            origins.push(e.origin);
            extended.push(e.row);
        }
        Ok(Context {
            scope: Cow::Owned(plan.scope().to_vec()),
            rows: Cow::Owned(extended),
            origins,
        })
    }

    fn hydrate_scalar(
        &self,
        variable: &str,
        join: Option<&Join>,
        scope: &[String],
        rows: &[Row],
        targets: &[usize],
    ) -> MapperResult<Vec<(usize, Value)>> {
        let ctx = self.expand(join, scope, rows)?;
        let column = ctx
            .scope
            .iter()
            .position(|v| v == variable)
            .ok_or_else(|| MapperError::unbound_variable(variable, &ctx.scope))?;
        Ok(ctx
            .rows
            .iter()
            .zip(&ctx.origins)
            .map(|(row, &origin)| (targets[origin], Value::Scalar(row[column].clone())))
            .collect())
    }

    fn hydrate_record(
        &self,
        members: &[(String, SchemaNode)],
        join: Option<&Join>,
        scope: &[String],
        rows: &[Row],
        targets: &[usize],
    ) -> MapperResult<Vec<(usize, Value)>> {
        let ctx = self.expand(join, scope, rows)?;

        // a single-valued relationship may match each parent at most once
        let mut slots: Vec<Option<BTreeMap<String, Value>>> = vec![None; rows.len()];
        if let Some(join) = join {
            let mut matches = vec![0usize; rows.len()];
            for &origin in &ctx.origins {
                matches[origin] += 1;
            }
            if let Some(&count) = matches.iter().find(|&&m| m > 1) {
                return Err(MapperError::AmbiguousRelationship {
                    table: join.table.clone(),
                    matches: count,
                });
            }
        }
        for &origin in &ctx.origins {
            slots[origin] = Some(BTreeMap::new());
        }

        for (name, member) in members {
            let pairs = self.hydrate_node(member, &ctx.scope, &ctx.rows, &ctx.origins)?;
            let values = collect_single(pairs, rows.len(), member.join())?;
            for (slot, value) in slots.iter_mut().zip(values) {
                if let Some(record) = slot {
                    record.insert(name.clone(), value.unwrap_or(Value::Absent));
                }
            }
        }

        Ok(targets
            .iter()
            .zip(slots)
            .map(|(&target, slot)| (target, slot.map(Value::Record).unwrap_or(Value::Absent)))
            .collect())
    }

    fn hydrate_sequence(
        &self,
        element: &SchemaNode,
        join: &Join,
        scope: &[String],
        rows: &[Row],
        targets: &[usize],
    ) -> MapperResult<Vec<(usize, Value)>> {
        let ctx = self.expand(Some(join), scope, rows)?;

        // one element per extended row, grouped per parent in table scan order
        let locals: Vec<usize> = (0..ctx.rows.len()).collect();
        let elements = self.hydrate_node(element, &ctx.scope, &ctx.rows, &locals)?;
        let elements = collect_single(elements, locals.len(), element.join())?;

        let mut lists: Vec<Vec<Value>> = vec![Vec::new(); rows.len()];
        for (&origin, value) in ctx.origins.iter().zip(elements) {
            lists[origin].push(value.unwrap_or(Value::Absent));
        }

        Ok(targets
            .iter()
            .zip(lists)
            .map(|(&target, list)| (target, Value::Sequence(list)))
            .collect())
    }

    fn hydrate_mapping(
        &self,
        key: &SchemaNode,
        value: &SchemaNode,
        join: &Join,
        scope: &[String],
        rows: &[Row],
        targets: &[usize],
    ) -> MapperResult<Vec<(usize, Value)>> {
        let ctx = self.expand(Some(join), scope, rows)?;

        // keys and values are produced per extended row, then paired up
        let locals: Vec<usize> = (0..ctx.rows.len()).collect();
        let keys = self.hydrate_node(key, &ctx.scope, &ctx.rows, &locals)?;
        let keys = collect_single(keys, locals.len(), key.join())?;
        let values = self.hydrate_node(value, &ctx.scope, &ctx.rows, &locals)?;
        let values = collect_single(values, locals.len(), value.join())?;

        let mut maps: Vec<Vec<(Value, Value)>> = vec![Vec::new(); rows.len()];
        let mut seen: Vec<HashSet<Value>> = vec![HashSet::new(); rows.len()];
        for ((origin, k), v) in ctx.origins.iter().zip(keys).zip(values) {
            let k = k.ok_or_else(|| MapperError::shape_mismatch("mapping key", "absent"))?;
            if !seen[*origin].insert(k.clone()) {
                return Err(MapperError::DuplicateKey {
                    table: join.table.clone(),
                    key: k.to_json().to_string(),
                });
            }
            maps[*origin].push((k, v.unwrap_or(Value::Absent)));
        }

        Ok(targets
            .iter()
            .zip(maps)
            .map(|(&target, map)| (target, Value::Mapping(map)))
            .collect())
    }
}

/// Places at most one value per target slot.
///
/// A second value for one slot means a joined node fanned out where a
/// single value was expected.
fn collect_single(
    pairs: Vec<(usize, Value)>,
    len: usize,
    join: Option<&Join>,
) -> MapperResult<Vec<Option<Value>>> {
    let mut slots: Vec<Option<Value>> = vec![None; len];
    let mut counts = vec![0usize; len];
    for (target, _) in &pairs {
        counts[*target] += 1;
    }
    if let Some(&count) = counts.iter().find(|&&c| c > 1) {
        return Err(MapperError::AmbiguousRelationship {
            table: join.map(|j| j.table.clone()).unwrap_or_default(),
            matches: count,
        });
    }
    for (target, value) in pairs {
        slots[target] = Some(value);
    }
    Ok(slots)
}

/// Hydrates `schema` from `store` once per root row.
pub fn hydrate(
    schema: &SchemaNode,
    store: &RelationalStore,
    root_columns: &[String],
    root_rows: &[Row],
    config: &MapperConfig,
) -> MapperResult<Vec<Value>> {
    Hydrator::new(store, config).hydrate(schema, root_columns, root_rows)
}
