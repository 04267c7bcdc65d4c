//! Schema validation against a root scope
//!
//! Checks the binding discipline of a schema tree without touching any data:
//! - every join's foreign-key columns are bound by an enclosing level
//! - fresh variables are columns of their join and do not rebind a name
//! - every scalar reads a bound variable
//! - record member names are unique and table arities agree

use super::node::{Join, SchemaNode};
use crate::error::{MapperError, MapperResult};
use std::collections::HashSet;

/// Validates schema trees for a fixed set of root variables
pub struct SchemaValidator<'a> {
    root_scope: &'a [String],
}

impl<'a> SchemaValidator<'a> {
    /// Create a validator whose root context binds `root_scope`
    pub fn new(root_scope: &'a [String]) -> Self {
        Self { root_scope }
    }

    /// Validate a whole schema tree
    pub fn validate(&self, schema: &SchemaNode) -> MapperResult<()> {
        schema.tables()?;
        self.validate_node(schema, self.root_scope)
    }

    fn validate_node(&self, node: &SchemaNode, scope: &[String]) -> MapperResult<()> {
        let scope = match node.join() {
            Some(join) => extend_scope(scope, join)?,
            None => scope.to_vec(),
        };

        match node {
            SchemaNode::Scalar { variable, .. } => {
                if !scope.contains(variable) {
                    return Err(MapperError::unbound_variable(variable.as_str(), &scope));
                }
                Ok(())
            }
            SchemaNode::Record { members, .. } => {
                let mut seen = HashSet::new();
                for (name, member) in members {
                    if !seen.insert(name.as_str()) {
                        return Err(MapperError::DuplicateMember {
                            member: name.clone(),
                        });
                    }
                    self.validate_node(member, &scope)?;
                }
                Ok(())
            }
            SchemaNode::Sequence { element, .. } => self.validate_node(element, &scope),
            SchemaNode::Mapping { key, value, .. } => {
                self.validate_node(key, &scope)?;
                self.validate_node(value, &scope)
            }
        }
    }
}

/// Validate `schema` for the given root variables.
pub fn validate(schema: &SchemaNode, root_scope: &[String]) -> MapperResult<()> {
    SchemaValidator::new(root_scope).validate(schema)
}

/// Checks one join against `scope` and returns the scope it leaves behind.
pub(crate) fn extend_scope(scope: &[String], join: &Join) -> MapperResult<Vec<String>> {
    let mut columns = HashSet::new();
    for column in &join.columns {
        if !columns.insert(column.as_str()) {
            return Err(MapperError::DuplicateVariable {
                table: join.table.clone(),
                variable: column.clone(),
            });
        }
    }

    let mut fresh = HashSet::new();
    for variable in &join.fresh {
        if !columns.contains(variable.as_str()) {
            return Err(MapperError::FreshNotInColumns {
                table: join.table.clone(),
                variable: variable.clone(),
            });
        }
        if !fresh.insert(variable.as_str()) {
            return Err(MapperError::DuplicateVariable {
                table: join.table.clone(),
                variable: variable.clone(),
            });
        }
        if scope.contains(variable) {
            return Err(MapperError::FreshShadowsBinding {
                table: join.table.clone(),
                variable: variable.clone(),
            });
        }
    }

    if let Some(unbound) = join.key_columns().find(|c| !scope.contains(*c)) {
        return Err(MapperError::unbound_variable(unbound.as_str(), scope));
    }

    let mut extended = scope.to_vec();
    extended.extend(join.fresh.iter().cloned());
    Ok(extended)
}
