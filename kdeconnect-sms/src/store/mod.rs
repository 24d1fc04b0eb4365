//! The read-only message store contract and its backends.
//!
//! A store answers a query with a [`Cursor`]: a forward-only sequence of rows
//! that must be closed once the caller is done with it.

mod memory;
mod sqlite;

pub use memory::MemoryMessageStore;
pub use sqlite::{NewSms, SqliteMessageStore};

use crate::address::StoreAddress;
use crate::error::StoreError;
use crate::message::Column;

/// One row of column values, in the cursor's column order.
///
/// `None` stands for SQL NULL.
pub type Row = Vec<Option<String>>;

/// Equality predicate with a single bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub column: Column,
    pub value: String,
}

impl Selection {
    pub fn equals(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    /// SQL form of the predicate, with `?` for the parameter.
    pub fn clause(&self) -> String {
        format!("{} = ?", self.column.name())
    }
}

/// A queryable, read-only message store.
pub trait MessageStore: Send + Sync {
    /// Run a query.
    ///
    /// An `Err` means the query could not be executed. A query matching
    /// nothing returns a cursor with no rows.
    fn query(
        &self,
        address: &StoreAddress,
        projection: &[Column],
        selection: Option<&Selection>,
    ) -> Result<Box<dyn Cursor + '_>, StoreError>;
}

/// Forward-only handle over a query result.
pub trait Cursor {
    /// Number of rows in the result.
    fn count(&self) -> usize;

    /// Column names in row order.
    fn column_names(&self) -> &[String];

    /// Position of a column in each row.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| c == name)
    }

    /// Advance to the next row, `Ok(None)` once exhausted.
    fn next_row(&mut self) -> Result<Option<Row>, StoreError>;

    /// Release the handle. Calling it more than once has no further effect.
    fn close(&mut self);
}

/// A cursor over rows already fetched into memory.
///
/// Used by backends that fill a window of rows up front, which is also what
/// makes [`Cursor::count`] available before iteration.
#[derive(Debug)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    count: usize,
    closed: bool,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            count: rows.len(),
            rows: rows.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for BufferedCursor {
    fn count(&self) -> usize {
        self.count
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>, StoreError> {
        if self.closed {
            return Err(StoreError::Backend("cursor is closed".to_string()));
        }
        Ok(self.rows.next())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            // Drop remaining rows now rather than with the cursor
            self.rows = Vec::new().into_iter();
        }
    }
}
