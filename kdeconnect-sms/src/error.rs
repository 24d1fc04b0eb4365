//! Error types for store access.

use thiserror::Error;

use crate::address::StoreAddress;
use crate::message::Column;

/// Result type alias for accessor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`MessageStore`](crate::store::MessageStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller is not allowed to read the store.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend does not serve this address.
    #[error("unknown store address: {0}")]
    UnknownAddress(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Errors returned by [`MessageStoreAccessor`](crate::MessageStoreAccessor).
///
/// An empty result is never an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The query could not be executed at all.
    #[error("message store unavailable at {address}: {source}")]
    StoreUnavailable {
        address: StoreAddress,
        #[source]
        source: StoreError,
    },

    /// The query ran but the cursor failed while being drained.
    #[error("failed reading rows from {address}: {source}")]
    Read {
        address: StoreAddress,
        #[source]
        source: StoreError,
    },

    /// The store returned a result without a requested column.
    #[error("store at {address} did not return column '{column}'")]
    MissingColumn {
        address: StoreAddress,
        column: Column,
    },

    /// A row used as a grouping key has no integer thread key.
    #[error("row has no usable thread key: {value:?}")]
    InvalidThreadKey { value: Option<String> },
}
