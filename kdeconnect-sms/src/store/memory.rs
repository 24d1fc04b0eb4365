//! In-memory message store.
//!
//! Rows are registered per content URI, so a store only answers the
//! addresses it was given. Cursors count as released once `close()` has been
//! called; a cursor dropped without closing stays counted as open.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BufferedCursor, Cursor, MessageStore, Row, Selection};
use crate::address::StoreAddress;
use crate::error::StoreError;
use crate::message::Column;

type RawRow = BTreeMap<String, Option<String>>;

#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    tables: HashMap<String, Vec<RawRow>>,
    open_cursors: Arc<AtomicUsize>,
    queries: AtomicUsize,
    denied: Option<String>,
    fail_after: Option<usize>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address with no rows, so queries against it succeed.
    pub fn register(&mut self, address: StoreAddress) -> &mut Self {
        self.tables.entry(address.uri().to_string()).or_default();
        self
    }

    /// Append a row under an address. Columns not given read as NULL.
    pub fn insert(&mut self, address: StoreAddress, columns: &[(&str, &str)]) -> &mut Self {
        let row = columns
            .iter()
            .map(|(name, value)| (name.to_string(), Some(value.to_string())))
            .collect();
        self.tables
            .entry(address.uri().to_string())
            .or_default()
            .push(row);
        self
    }

    /// Refuse every query as if the caller lacked read permission.
    pub fn deny(&mut self, reason: impl Into<String>) -> &mut Self {
        self.denied = Some(reason.into());
        self
    }

    /// Make cursors fail after yielding `rows` rows.
    pub fn fail_after(&mut self, rows: usize) -> &mut Self {
        self.fail_after = Some(rows);
        self
    }

    /// Cursors handed out and not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl MessageStore for MemoryMessageStore {
    fn query(
        &self,
        address: &StoreAddress,
        projection: &[Column],
        selection: Option<&Selection>,
    ) -> Result<Box<dyn Cursor + '_>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.denied {
            return Err(StoreError::PermissionDenied(reason.clone()));
        }

        let table = self
            .tables
            .get(address.uri())
            .ok_or_else(|| StoreError::UnknownAddress(address.uri().to_string()))?;

        let rows: Vec<Row> = table
            .iter()
            .filter(|row| {
                selection.map_or(true, |s| {
                    row.get(s.column.name()).and_then(Option::as_deref) == Some(s.value.as_str())
                })
            })
            .map(|row| {
                projection
                    .iter()
                    .map(|c| row.get(c.name()).cloned().flatten())
                    .collect()
            })
            .collect();

        let columns = projection.iter().map(|c| c.name().to_string()).collect();

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            inner: BufferedCursor::new(columns, rows),
            open_cursors: Arc::clone(&self.open_cursors),
            fail_after: self.fail_after,
            served: 0,
        }))
    }
}

struct MemoryCursor {
    inner: BufferedCursor,
    open_cursors: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    served: usize,
}

impl Cursor for MemoryCursor {
    fn count(&self) -> usize {
        self.inner.count()
    }

    fn column_names(&self) -> &[String] {
        self.inner.column_names()
    }

    fn next_row(&mut self) -> Result<Option<Row>, StoreError> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            return Err(StoreError::Backend("simulated read failure".to_string()));
        }
        let row = self.inner.next_row()?;
        if row.is_some() {
            self.served += 1;
        }
        Ok(row)
    }

    fn close(&mut self) {
        if !self.inner.is_closed() {
            self.inner.close();
            self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
