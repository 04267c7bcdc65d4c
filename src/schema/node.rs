use crate::error::{MapperError, MapperResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rule for fetching rows of one table keyed by variables already in scope.
///
/// `columns` names every position of the table's tuples, in order. The
/// columns that are not `fresh` form the foreign key; `fresh` columns are
/// bound as new variables, in `fresh` order, once the join is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub fresh: Vec<String>,
}

impl Join {
    pub fn new(table: &str, columns: &[&str], fresh: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            fresh: fresh.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Number of positions in each row of the joined table.
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn is_fresh(&self, column: &str) -> bool {
        self.fresh.iter().any(|f| f == column)
    }

    /// The foreign-key columns (`columns` minus `fresh`), in column order.
    pub fn key_columns(&self) -> impl Iterator<Item = &String> + '_ {
        self.columns.iter().filter(move |c| !self.is_fresh(c))
    }
}

/// One node of the declarative schema tree.
///
/// The same tree drives hydration and dehydration. `Sequence` and `Mapping`
/// always carry a join; a `Record` without one reuses its parent's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Scalar {
        variable: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<Join>,
    },
    Record {
        members: Vec<(String, SchemaNode)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<Join>,
    },
    Sequence {
        element: Box<SchemaNode>,
        join: Join,
    },
    Mapping {
        key: Box<SchemaNode>,
        value: Box<SchemaNode>,
        join: Join,
    },
}

impl SchemaNode {
    pub fn scalar(variable: &str) -> Self {
        SchemaNode::Scalar {
            variable: variable.to_string(),
            join: None,
        }
    }

    pub fn record<S: Into<String>>(members: Vec<(S, SchemaNode)>) -> Self {
        SchemaNode::Record {
            members: members.into_iter().map(|(n, m)| (n.into(), m)).collect(),
            join: None,
        }
    }

    pub fn sequence(element: SchemaNode, join: Join) -> Self {
        SchemaNode::Sequence {
            element: Box::new(element),
            join,
        }
    }

    pub fn mapping(key: SchemaNode, value: SchemaNode, join: Join) -> Self {
        SchemaNode::Mapping {
            key: Box::new(key),
            value: Box::new(value),
            join,
        }
    }

    /// Replaces this node's join.
    #[must_use]
    pub fn with_join(mut self, new_join: Join) -> Self {
        match &mut self {
            SchemaNode::Scalar { join, .. } | SchemaNode::Record { join, .. } => {
                *join = Some(new_join)
            }
            SchemaNode::Sequence { join, .. } | SchemaNode::Mapping { join, .. } => *join = new_join,
        }
        self
    }

    pub fn join(&self) -> Option<&Join> {
        match self {
            SchemaNode::Scalar { join, .. } | SchemaNode::Record { join, .. } => join.as_ref(),
            SchemaNode::Sequence { join, .. } | SchemaNode::Mapping { join, .. } => Some(join),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Scalar { .. } => "scalar",
            SchemaNode::Record { .. } => "record",
            SchemaNode::Sequence { .. } => "sequence",
            SchemaNode::Mapping { .. } => "mapping",
        }
    }

    /// Every table referenced anywhere in the tree, with its arity.
    ///
    /// # Errors
    ///
    /// Returns `ArityMismatch` when two joins disagree on one table's arity.
    pub fn tables(&self) -> MapperResult<BTreeMap<String, usize>> {
        let mut tables = BTreeMap::new();
        self.collect_tables(&mut tables)?;
        Ok(tables)
    }

    fn collect_tables(&self, tables: &mut BTreeMap<String, usize>) -> MapperResult<()> {
        if let Some(join) = self.join() {
            match tables.get(&join.table) {
                Some(&expected) if expected != join.arity() => {
                    return Err(MapperError::ArityMismatch {
                        table: join.table.clone(),
                        expected,
                        found: join.arity(),
                    });
                }
                Some(_) => {}
                None => {
                    tables.insert(join.table.clone(), join.arity());
                }
            }
        }
        match self {
            SchemaNode::Scalar { .. } => Ok(()),
            SchemaNode::Record { members, .. } => members
                .iter()
                .try_for_each(|(_, member)| member.collect_tables(tables)),
            SchemaNode::Sequence { element, .. } => element.collect_tables(tables),
            SchemaNode::Mapping { key, value, .. } => {
                key.collect_tables(tables)?;
                value.collect_tables(tables)
            }
        }
    }
}
