//! # Mapper Error Handling
//!
//! Unified error type for hydration and dehydration. Every variant is fatal
//! for the call that produced it: a failed `hydrate` or `dehydrate` yields no
//! partial output.
//!
//! Variants are grouped by [`ErrorKind`] so callers can classify a failure
//! without matching on every variant.

use thiserror::Error;

/// Broad category of a [`MapperError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The schema is malformed with respect to the scope it is used in.
    Schema,
    /// Table rows and the enclosing scope disagree about a relationship.
    Join,
    /// A deferred cell left its state machine.
    Cell,
    /// The tree value does not have the shape the schema describes.
    Type,
    /// A mapping produced the same key twice for one parent.
    DuplicateKey,
}

/// Unified error type for schema-driven mapping operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    // ========== Schema Errors ==========
    /// A variable is read before any enclosing join binds it
    #[error("Variable '{variable}' is not bound in scope [{scope}]")]
    UnboundVariable { variable: String, scope: String },

    /// A join lists the same column twice
    #[error("Join on table '{table}' lists column '{variable}' more than once")]
    DuplicateVariable { table: String, variable: String },

    /// A fresh variable is not one of the join's columns
    #[error("Fresh variable '{variable}' is not a column of table '{table}'")]
    FreshNotInColumns { table: String, variable: String },

    /// A fresh variable would rebind a name already in scope
    #[error("Fresh variable '{variable}' of table '{table}' is already bound")]
    FreshShadowsBinding { table: String, variable: String },

    /// A record declares the same member twice
    #[error("Record declares member '{member}' more than once")]
    DuplicateMember { member: String },

    /// A table row or join disagrees with the table's arity
    #[error("Table '{table}' expects rows of arity {expected}, found {found}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    /// A join references a table the store does not hold
    #[error("Table '{table}' does not exist in the store")]
    UnknownTable { table: String },

    /// Two active parents share one join key, so child rows cannot be routed
    #[error("Join on table '{table}' has non-unique parent key {key}")]
    DuplicateParentKey { table: String, key: String },

    /// The textual declaration language could not be parsed
    #[error("Invalid schema declaration at line {line}: {message}")]
    Declaration { line: usize, message: String },

    // ========== Join Errors ==========
    /// A table row references a parent that is not in the current scope
    #[error("Row {row} of table '{table}' references missing parent key {key}")]
    DanglingForeignKey {
        table: String,
        row: usize,
        key: String,
    },

    /// A single-valued relationship matched more than one row for one parent
    #[error("Relationship through table '{table}' matched {matches} rows for one parent")]
    AmbiguousRelationship { table: String, matches: usize },

    // ========== Cell Errors ==========
    /// A deferred cell was written after it already held a value
    #[error("Cell for '{variable}' written twice")]
    DoubleWrite { variable: String },

    /// A rewrite of a cell disagreed with its first value
    #[error("Cell for '{variable}' holds {existing}, cannot rewrite with {attempted}")]
    ConflictingWrite {
        variable: String,
        existing: String,
        attempted: String,
    },

    /// A cell emitted into a table was never written
    #[error("Cell in column {column} of table '{table}' was never written")]
    UnresolvedCell { table: String, column: usize },

    // ========== Type Errors ==========
    /// The tree holds a different kind of value than the schema expects
    #[error("Expected {expected} but found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// A record value lacks a member the schema declares
    #[error("Record value is missing member '{member}'")]
    MissingMember { member: String },

    /// A record value carries a member the schema does not declare
    #[error("Record value has undeclared member '{member}'")]
    UnknownMember { member: String },

    // ========== Duplicate Key Errors ==========
    /// A mapping produced two equal keys for the same parent
    #[error("Mapping over table '{table}' produced duplicate key {key}")]
    DuplicateKey { table: String, key: String },
}

impl MapperError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnboundVariable { .. }
            | Self::DuplicateVariable { .. }
            | Self::FreshNotInColumns { .. }
            | Self::FreshShadowsBinding { .. }
            | Self::DuplicateMember { .. }
            | Self::ArityMismatch { .. }
            | Self::UnknownTable { .. }
            | Self::DuplicateParentKey { .. }
            | Self::Declaration { .. } => ErrorKind::Schema,
            Self::DanglingForeignKey { .. } | Self::AmbiguousRelationship { .. } => ErrorKind::Join,
            Self::DoubleWrite { .. } | Self::ConflictingWrite { .. } | Self::UnresolvedCell { .. } => {
                ErrorKind::Cell
            }
            Self::ShapeMismatch { .. } | Self::MissingMember { .. } | Self::UnknownMember { .. } => {
                ErrorKind::Type
            }
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
        }
    }

    pub fn unbound_variable(variable: impl Into<String>, scope: &[String]) -> Self {
        Self::UnboundVariable {
            variable: variable.into(),
            scope: scope.join(", "),
        }
    }

    pub fn shape_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn declaration(line: usize, message: impl Into<String>) -> Self {
        Self::Declaration {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for mapping operations
pub type MapperResult<T> = Result<T, MapperError>;
