//! SQLite-backed message store reading an Android style `sms` table.
//!
//! Both variants of each address are served from the same table. The
//! conversation view picks, per thread, the row SQLite orders first by
//! `date` (ties broken by row id), newest threads first.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use super::{BufferedCursor, Cursor, MessageStore, Row, Selection};
use crate::address::{AddressScope, StoreAddress};
use crate::error::StoreError;
use crate::message::Column;

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS sms (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER,
    address TEXT,
    person INTEGER,
    date INTEGER,
    read INTEGER NOT NULL DEFAULT 0,
    type INTEGER,
    body TEXT
);
CREATE INDEX IF NOT EXISTS sms_thread_id ON sms (thread_id);
";

/// A message to write into the `sms` table.
#[derive(Debug, Clone, Default)]
pub struct NewSms<'a> {
    pub thread_id: i64,
    pub address: &'a str,
    pub body: &'a str,
    pub date: i64,
    pub message_type: i32,
    pub read: bool,
    pub person: Option<i64>,
}

pub struct SqliteMessageStore {
    conn: Mutex<Connection>,
}

impl SqliteMessageStore {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!("Opened message store {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Open or create a writable database and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let store = Self::from_connection(Connection::open(path)?);
        store.init_schema()?;
        Ok(store)
    }

    /// Create an empty in-memory database with the schema in place.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self::from_connection(Connection::open_in_memory()?);
        store.init_schema()?;
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("message store connection poisoned".to_string()))
    }

    /// Create the `sms` table if it does not exist.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert a message, returning its row id.
    pub fn insert(&self, sms: &NewSms<'_>) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sms (thread_id, address, person, date, read, type, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sms.thread_id,
                sms.address,
                sms.person,
                sms.date,
                i32::from(sms.read),
                sms.message_type,
                sms.body,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

/// Build the SELECT for an address. Column names come from [`Column`], never
/// from caller input.
fn build_query(scope: AddressScope, projection: &[Column], selection: Option<&Selection>) -> String {
    let columns = projection
        .iter()
        .map(|c| format!("s.{name} AS {name}", name = c.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut filters = Vec::new();
    if scope == AddressScope::Conversations {
        filters.push(
            "s._id = (SELECT latest._id FROM sms AS latest \
             WHERE latest.thread_id IS s.thread_id \
             ORDER BY latest.date DESC, latest._id DESC LIMIT 1)"
                .to_string(),
        );
    }
    if let Some(selection) = selection {
        filters.push(format!("s.{}", selection.clause()));
    }

    let mut sql = format!("SELECT {columns} FROM sms AS s");
    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }
    sql.push_str(match scope {
        AddressScope::Messages => " ORDER BY s._id",
        AddressScope::Conversations => " ORDER BY s.date DESC, s._id DESC",
    });
    sql
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

impl MessageStore for SqliteMessageStore {
    fn query(
        &self,
        address: &StoreAddress,
        projection: &[Column],
        selection: Option<&Selection>,
    ) -> Result<Box<dyn Cursor + '_>, StoreError> {
        // Only the four known content URIs are served
        let address = StoreAddress::from_uri(address.uri())
            .ok_or_else(|| StoreError::UnknownAddress(address.uri().to_string()))?;

        let sql = build_query(address.scope, projection, selection);
        tracing::debug!("Querying {}: {}", address, sql);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let params = selection.map(|s| s.value.as_str());
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut window: Vec<Row> = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..width)
                .map(|i| row.get_ref(i).map(value_to_string))
                .collect::<Result<Row, _>>()?;
            window.push(values);
        }

        Ok(Box::new(BufferedCursor::new(columns, window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressVariant;
    use crate::message::PROJECTION;

    fn sms(thread_id: i64, body: &str, date: i64) -> NewSms<'_> {
        NewSms {
            thread_id,
            address: "+15551234567",
            body,
            date,
            message_type: 1,
            read: false,
            person: None,
        }
    }

    fn drain(mut cursor: Box<dyn Cursor + '_>) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().unwrap() {
            rows.push(row);
        }
        cursor.close();
        rows
    }

    #[test]
    fn test_build_query_for_messages() {
        let selection = Selection::equals(Column::ThreadId, "4");
        let sql = build_query(
            AddressScope::Messages,
            &[Column::Body, Column::ThreadId],
            Some(&selection),
        );
        assert_eq!(
            sql,
            "SELECT s.body AS body, s.thread_id AS thread_id FROM sms AS s \
             WHERE s.thread_id = ? ORDER BY s._id"
        );
    }

    #[test]
    fn test_message_query_returns_projection_in_store_order() {
        let store = SqliteMessageStore::open_in_memory().unwrap();
        store.insert(&sms(1, "hi", 200)).unwrap();
        store.insert(&sms(2, "yo", 100)).unwrap();
        store.insert(&sms(1, "there", 50)).unwrap();

        let address = StoreAddress::new(AddressScope::Messages, AddressVariant::Legacy);
        let selection = Selection::equals(Column::ThreadId, "1");
        let cursor = store.query(&address, &PROJECTION, Some(&selection)).unwrap();
        assert_eq!(cursor.count(), 2);
        let names: Vec<&str> = PROJECTION.iter().map(|c| c.name()).collect();
        assert_eq!(cursor.column_names(), names.as_slice());

        let body = cursor.column_index("body").unwrap();
        let person = cursor.column_index("person").unwrap();
        let rows = drain(cursor);
        let bodies: Vec<_> = rows.iter().map(|r| r[body].as_deref()).collect();
        assert_eq!(bodies, [Some("hi"), Some("there")]);
        assert!(rows.iter().all(|r| r[person].is_none()));
    }

    #[test]
    fn test_conversation_query_picks_latest_per_thread() {
        let store = SqliteMessageStore::open_in_memory().unwrap();
        store.insert(&sms(1, "old", 100)).unwrap();
        store.insert(&sms(1, "new", 300)).unwrap();
        store.insert(&sms(2, "only", 200)).unwrap();
        store.insert(&sms(1, "older", 10)).unwrap();

        let address = StoreAddress::new(AddressScope::Conversations, AddressVariant::Modern);
        let cursor = store.query(&address, &PROJECTION, None).unwrap();
        let body = cursor.column_index("body").unwrap();
        let date = cursor.column_index("date").unwrap();
        let rows = drain(cursor);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][body].as_deref(), Some("new"));
        assert_eq!(rows[0][date].as_deref(), Some("300"));
        assert_eq!(rows[1][body].as_deref(), Some("only"));
    }

    #[test]
    fn test_non_integer_thread_filter_matches_nothing() {
        let store = SqliteMessageStore::open_in_memory().unwrap();
        store.insert(&sms(1, "hi", 1)).unwrap();

        let address = StoreAddress::new(AddressScope::Messages, AddressVariant::Modern);
        let selection = Selection::equals(Column::ThreadId, "not-a-number");
        let cursor = store.query(&address, &PROJECTION, Some(&selection)).unwrap();
        assert_eq!(cursor.count(), 0);
        assert!(drain(cursor).is_empty());
    }

    #[test]
    fn test_open_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mmssms.db");
        {
            let store = SqliteMessageStore::create(&path).unwrap();
            store.insert(&sms(9, "persisted", 5)).unwrap();
        }

        let store = SqliteMessageStore::open(&path).unwrap();
        let address = StoreAddress::new(AddressScope::Messages, AddressVariant::Modern);
        let rows = drain(store.query(&address, &PROJECTION, None).unwrap());
        assert_eq!(rows.len(), 1);
        assert!(store.insert(&sms(9, "rejected", 6)).is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqliteMessageStore::open(&dir.path().join("absent.db")).is_err());
    }
}
