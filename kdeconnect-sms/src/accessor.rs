//! Thread and conversation queries over a [`MessageStore`].
//!
//! Every call runs a fresh query and materializes new values; nothing is
//! cached between calls. All calls block on the store.

use std::collections::HashMap;

use crate::address::{AddressResolver, StoreAddress};
use crate::error::{Error, Result};
use crate::message::{Column, Message, ThreadId, PROJECTION};
use crate::store::{Cursor, MessageStore, Selection};

/// Latest message of each thread, keyed by thread.
pub type ThreadIndex = HashMap<ThreadId, Message>;

/// Reads messages out of a store at the addresses chosen by a resolver.
pub struct MessageStoreAccessor<S, R> {
    store: S,
    resolver: R,
}

impl<S: MessageStore, R: AddressResolver> MessageStoreAccessor<S, R> {
    pub fn new(store: S, resolver: R) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// All messages of one thread, in the order the store returns them.
    pub fn messages_in_thread(&self, thread_id: ThreadId) -> Result<Vec<Message>> {
        let address = self.resolver.message_store_address();
        let selection = Selection::equals(Column::ThreadId, thread_id.to_string());
        let mut cursor = self.open(&address, Some(&selection))?;

        let mut messages = Vec::with_capacity(cursor.count());
        while let Some(message) = cursor.next_message()? {
            messages.push(message);
        }

        tracing::debug!(
            "Loaded {} messages for thread {} from {}",
            messages.len(),
            thread_id,
            address
        );
        Ok(messages)
    }

    /// One representative message per thread, as chosen by the store's
    /// conversation view.
    ///
    /// If the view repeats a thread, the later row wins.
    pub fn conversations(&self) -> Result<ThreadIndex> {
        let address = self.resolver.conversation_store_address();
        let mut cursor = self.open(&address, None)?;

        let mut index = ThreadIndex::with_capacity(cursor.count());
        while let Some(message) = cursor.next_message()? {
            index.insert(thread_key(&message)?, message);
        }

        tracing::debug!("Loaded {} conversations from {}", index.len(), address);
        Ok(index)
    }

    /// Every message in the store grouped by thread.
    ///
    /// Within a thread, messages keep the store's order.
    pub fn messages_by_thread(&self) -> Result<HashMap<ThreadId, Vec<Message>>> {
        let address = self.resolver.message_store_address();
        let mut cursor = self.open(&address, None)?;

        let mut threads: HashMap<ThreadId, Vec<Message>> = HashMap::new();
        while let Some(message) = cursor.next_message()? {
            threads
                .entry(thread_key(&message)?)
                .or_default()
                .push(message);
        }

        tracing::debug!(
            "Grouped messages into {} threads from {}",
            threads.len(),
            address
        );
        Ok(threads)
    }

    fn open(
        &self,
        address: &StoreAddress,
        selection: Option<&Selection>,
    ) -> Result<ScopedCursor<'_>> {
        let cursor = self
            .store
            .query(address, &PROJECTION, selection)
            .map_err(|source| {
                tracing::warn!("Query against {} could not run: {}", address, source);
                Error::StoreUnavailable {
                    address: *address,
                    source,
                }
            })?;

        // Wrap before anything else can fail so the handle is always released
        ScopedCursor::new(cursor, *address)
    }
}

fn thread_key(message: &Message) -> Result<ThreadId> {
    message.thread().ok_or_else(|| Error::InvalidThreadKey {
        value: message.thread_id.clone(),
    })
}

/// Closes the wrapped cursor when dropped.
struct ScopedCursor<'a> {
    cursor: Box<dyn Cursor + 'a>,
    address: StoreAddress,
    positions: [usize; PROJECTION.len()],
}

impl<'a> ScopedCursor<'a> {
    fn new(cursor: Box<dyn Cursor + 'a>, address: StoreAddress) -> Result<Self> {
        let mut scoped = Self {
            cursor,
            address,
            positions: [0; PROJECTION.len()],
        };
        for (slot, column) in PROJECTION.into_iter().enumerate() {
            scoped.positions[slot] = scoped
                .cursor
                .column_index(column.name())
                .ok_or(Error::MissingColumn { address, column })?;
        }
        Ok(scoped)
    }

    fn count(&self) -> usize {
        self.cursor.count()
    }

    fn next_message(&mut self) -> Result<Option<Message>> {
        let row = match self.cursor.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(source) => {
                tracing::warn!("Reading from {} failed: {}", self.address, source);
                return Err(Error::Read {
                    address: self.address,
                    source,
                });
            }
        };

        let mut message = Message::default();
        for (column, &position) in PROJECTION.into_iter().zip(&self.positions) {
            message.set_column(column, row.get(position).cloned().flatten());
        }
        Ok(Some(message))
    }
}

impl Drop for ScopedCursor<'_> {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
