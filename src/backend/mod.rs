//! Key-value database clients the session store delegates to
//!
//! The store never talks to a database directly; it goes through a
//! [`KvClient`], which exposes the handful of record primitives a session
//! store needs. Records live under a `(namespace, set, sid)` key.

mod memory;

pub use memory::MemoryClient;

#[cfg(feature = "redis-store")]
mod redis_store;

#[cfg(feature = "redis-store")]
pub use redis_store::RedisClient;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::broadcast;

use crate::error::ClientError;

/// Named fields of a stored record
pub type Record = Map<String, Value>;

/// Connection options passed through to client construction
pub type ClientOptions = Map<String, Value>;

/// Address of a single session record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub namespace: String,
    pub set: String,
    pub sid: String,
}

impl Key {
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            sid: sid.into(),
        }
    }

    /// Whether this key lives in the given namespace and set
    pub fn in_set(&self, namespace: &str, set: &str) -> bool {
        self.namespace == namespace && self.set == set
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.sid)
    }
}

/// Write metadata sent along with a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteMeta {
    /// Time-to-live in seconds; `None` leaves expiry to the database default
    pub ttl: Option<u64>,
}

/// Lifecycle notifications raised by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// A database node became reachable
    NodeAdded,
    /// The client lost (or closed) its connection
    Disconnected,
}

/// Database client primitives used by the session store
#[async_trait]
pub trait KvClient: Send + Sync + 'static {
    /// Build an unconnected client from pass-through connection options
    fn from_options(options: &ClientOptions) -> Result<Self, ClientError>
    where
        Self: Sized;

    /// Establish the connection
    async fn connect(&self) -> Result<(), ClientError>;

    /// Whether the client currently holds a live connection
    fn is_connected(&self) -> bool;

    /// Read a record; a missing record is [`ClientError::NotFound`]
    async fn get(&self, key: &Key) -> Result<Record, ClientError>;

    /// Write a record, replacing any previous one
    async fn put(&self, key: &Key, record: Record, meta: WriteMeta) -> Result<(), ClientError>;

    /// Delete a record; a missing record is [`ClientError::NotFound`]
    async fn remove(&self, key: &Key) -> Result<(), ClientError>;

    /// Refresh a record's TTL without rewriting its data
    async fn touch(&self, key: &Key, ttl: u64) -> Result<(), ClientError>;

    /// Delete every record in a namespace/set
    async fn truncate(&self, namespace: &str, set: &str) -> Result<(), ClientError>;

    /// Number of records in a namespace/set
    async fn count(&self, _namespace: &str, _set: &str) -> Result<usize, ClientError> {
        Err(ClientError::Unsupported("count"))
    }

    /// Release the connection
    async fn close(&self, flush_pending: bool);

    /// Subscribe to client lifecycle events, if the client raises any
    fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        None
    }
}
