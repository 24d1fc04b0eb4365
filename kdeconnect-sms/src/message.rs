//! Message records and thread identity.
//!
//! A [`Message`] holds exactly the fixed projection of columns read from the
//! store. The `type` and `read` columns are kept as the raw text the store
//! returned; nothing in this crate decodes them.

use std::any::Any;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::Serialize;

/// A column of the fixed projection requested on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Phone number of the remote party.
    Address,
    /// Body of the message.
    Body,
    /// Timestamp in milliseconds since the epoch, as text.
    Date,
    /// Raw message type code.
    Type,
    /// Reference to a contact entry, often absent.
    Person,
    /// Raw read flag.
    Read,
    /// Key binding the message to its thread.
    ThreadId,
}

/// The projection shared by every query shape, in request order.
pub const PROJECTION: [Column; 7] = [
    Column::Address,
    Column::Body,
    Column::Date,
    Column::Type,
    Column::Person,
    Column::Read,
    Column::ThreadId,
];

impl Column {
    /// Column name as it appears in the store.
    pub const fn name(self) -> &'static str {
        match self {
            Column::Address => "address",
            Column::Body => "body",
            Column::Date => "date",
            Column::Type => "type",
            Column::Person => "person",
            Column::Read => "read",
            Column::ThreadId => "thread_id",
        }
    }

    /// Look up a projection column by its store name.
    pub fn from_name(name: &str) -> Option<Self> {
        PROJECTION.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shown by [`Message`]'s `Display` when the body column is absent.
pub const NO_BODY_PLACEHOLDER: &str = "(no message body)";

/// A single message as read from the store.
///
/// Every field is optional because the store may return NULL for any column;
/// `person` in particular is usually empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    pub address: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub person: Option<String>,
    pub read: Option<String>,
    pub thread_id: Option<String>,
}

impl Message {
    /// Value of a projection column.
    pub fn column(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::Address => &self.address,
            Column::Body => &self.body,
            Column::Date => &self.date,
            Column::Type => &self.message_type,
            Column::Person => &self.person,
            Column::Read => &self.read,
            Column::ThreadId => &self.thread_id,
        };
        value.as_deref()
    }

    /// Set a projection column.
    pub fn set_column(&mut self, column: Column, value: Option<String>) {
        let slot = match column {
            Column::Address => &mut self.address,
            Column::Body => &mut self.body,
            Column::Date => &mut self.date,
            Column::Type => &mut self.message_type,
            Column::Person => &mut self.person,
            Column::Read => &mut self.read,
            Column::ThreadId => &mut self.thread_id,
        };
        *slot = value;
    }

    /// Value of a column looked up by its store name.
    ///
    /// Names outside the projection always yield `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        Column::from_name(name).and_then(|c| self.column(c))
    }

    /// All projection columns with their values, in projection order.
    pub fn columns(&self) -> impl Iterator<Item = (Column, Option<&str>)> + '_ {
        PROJECTION.into_iter().map(move |c| (c, self.column(c)))
    }

    /// The thread this message belongs to, if its thread key is an integer.
    pub fn thread(&self) -> Option<ThreadId> {
        self.thread_id.as_deref().and_then(|v| v.parse().ok())
    }

    /// Timestamp in milliseconds, if the date column holds an integer.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.date.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.body.as_deref().unwrap_or(NO_BODY_PLACEHOLDER))
    }
}

/// Identity of a conversation thread.
///
/// Equality and hashing come from the wrapped integer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ThreadId(i64);

impl ThreadId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Compare against a value of any type.
    ///
    /// Anything that is not a `ThreadId` is unequal.
    pub fn matches(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<ThreadId>()
            .is_some_and(|other| other == self)
    }
}

impl From<i64> for ThreadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ThreadId> for i64 {
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

impl FromStr for ThreadId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
