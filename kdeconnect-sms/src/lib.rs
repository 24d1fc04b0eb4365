//! Thread-addressable access to an Android style SMS message store.
//!
//! [`MessageStoreAccessor`] reads rows through a [`MessageStore`] backend at
//! addresses chosen by an [`AddressResolver`], and turns them into
//! [`Message`] values grouped by [`ThreadId`].

pub mod accessor;
pub mod address;
pub mod error;
pub mod message;
pub mod store;

pub use accessor::{MessageStoreAccessor, ThreadIndex};
pub use address::{
    AddressResolver, AddressScope, AddressVariant, FixedResolver, PlatformResolver, StoreAddress,
    KITKAT_API_LEVEL,
};
pub use error::{Error, Result, StoreError};
pub use message::{Column, Message, ThreadId, PROJECTION};
pub use store::{Cursor, MemoryMessageStore, MessageStore, Selection, SqliteMessageStore};
