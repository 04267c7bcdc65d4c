//! Single-assignment cells used while dehydrating.
//!
//! A row is registered with its table before the values of its fresh
//! columns are known. Each such column holds a [`DeferredCell`] that the
//! matching scalar leaf fills in later, and a final pass resolves every cell
//! to its concrete [`Datum`].
//!
//! ```text
//! Empty --write--> Written --resolve--> Resolved
//! ```
//!
//! Writing a cell that already holds a value and resolving an empty cell
//! are errors. A resolved cell may be resolved again, since rows extended
//! from one parent share that parent's cells.

use crate::config::CellRewritePolicy;
use crate::error::{MapperError, MapperResult};
use crate::value::Datum;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum CellState {
    Empty,
    Written(Datum),
    Resolved(Datum),
}

#[derive(Debug)]
struct CellInner {
    variable: String,
    state: RefCell<CellState>,
}

/// A shared handle to one single-assignment cell.
///
/// Cloning the handle shares the cell; it never copies the value.
#[derive(Debug, Clone)]
pub struct DeferredCell {
    inner: Rc<CellInner>,
}

impl DeferredCell {
    /// A new, empty cell for `variable`.
    pub fn new(variable: &str) -> Self {
        Self::with_state(variable, CellState::Empty)
    }

    /// A cell whose value is already known, such as a root binding.
    pub fn written(variable: &str, value: Datum) -> Self {
        Self::with_state(variable, CellState::Written(value))
    }

    fn with_state(variable: &str, state: CellState) -> Self {
        Self {
            inner: Rc::new(CellInner {
                variable: variable.to_string(),
                state: RefCell::new(state),
            }),
        }
    }

    pub fn variable(&self) -> &str {
        &self.inner.variable
    }

    pub fn is_empty(&self) -> bool {
        matches!(*self.inner.state.borrow(), CellState::Empty)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.inner.state.borrow(), CellState::Resolved(_))
    }

    /// Whether both handles point at the same cell.
    pub fn same_cell(&self, other: &DeferredCell) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stores `value` in an empty cell.
    ///
    /// Under [`CellRewritePolicy::AllowEqual`] a second write of an equal
    /// value is accepted; any other write to a filled cell fails.
    pub fn write(&self, value: Datum, policy: CellRewritePolicy) -> MapperResult<()> {
        let mut state = self.inner.state.borrow_mut();
        let existing = match &*state {
            CellState::Empty => None,
            CellState::Written(existing) | CellState::Resolved(existing) => Some(existing.clone()),
        };
        match existing {
            None => {
                *state = CellState::Written(value);
                Ok(())
            }
            Some(existing) => match policy {
                CellRewritePolicy::AllowEqual if existing == value => Ok(()),
                CellRewritePolicy::AllowEqual => Err(MapperError::ConflictingWrite {
                    variable: self.inner.variable.clone(),
                    existing: existing.to_string(),
                    attempted: value.to_string(),
                }),
                CellRewritePolicy::Reject => Err(MapperError::DoubleWrite {
                    variable: self.inner.variable.clone(),
                }),
            },
        }
    }

    /// Finalizes the cell and returns its value.
    ///
    /// `table` and `column` locate the cell for the error raised when it
    /// was never written.
    pub fn resolve(&self, table: &str, column: usize) -> MapperResult<Datum> {
        let mut state = self.inner.state.borrow_mut();
        let value = match &*state {
            CellState::Empty => {
                return Err(MapperError::UnresolvedCell {
                    table: table.to_string(),
                    column,
                })
            }
            CellState::Written(value) | CellState::Resolved(value) => value.clone(),
        };
        *state = CellState::Resolved(value.clone());
        Ok(value)
    }
}
