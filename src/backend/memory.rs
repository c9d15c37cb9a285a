//! In-memory key-value client
//!
//! This is primarily for development and testing.
//! For production, use RedisClient or another persistent backend.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::{ClientEvent, ClientOptions, Key, KvClient, Record, WriteMeta};
use crate::error::ClientError;

struct StoredRecord {
    record: Record,
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }
}

// A TTL too large for the clock never expires
fn expiry(ttl: Option<u64>) -> Option<Instant> {
    ttl.and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)))
}

/// In-memory key-value client
///
/// Clones share the same records and connection state, so a clone can
/// stand in for an externally owned client.
///
/// Warning: records are lost on restart and are not shared across processes.
#[derive(Clone)]
pub struct MemoryClient {
    records: Arc<RwLock<HashMap<Key, StoredRecord>>>,
    connected: Arc<AtomicBool>,
    events: broadcast::Sender<ClientEvent>,
}

impl MemoryClient {
    /// Create a new, unconnected memory client
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Drop records whose TTL has passed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.records.write().retain(|_, stored| stored.is_live(now));
    }

    /// Remaining TTL of a live record; `None` if missing or without expiry
    pub fn ttl_of(&self, key: &Key) -> Option<Duration> {
        let now = Instant::now();
        let records = self.records.read();
        records
            .get(key)
            .filter(|stored| stored.is_live(now))
            .and_then(|stored| stored.expires_at)
            .map(|exp| exp - now)
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvClient for MemoryClient {
    fn from_options(_options: &ClientOptions) -> Result<Self, ClientError> {
        Ok(Self::new())
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(ClientEvent::NodeAdded);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &Key) -> Result<Record, ClientError> {
        self.ensure_connected()?;
        let records = self.records.read();
        match records.get(key) {
            Some(stored) if stored.is_live(Instant::now()) => Ok(stored.record.clone()),
            _ => Err(ClientError::NotFound),
        }
    }

    async fn put(&self, key: &Key, record: Record, meta: WriteMeta) -> Result<(), ClientError> {
        self.ensure_connected()?;
        let stored = StoredRecord {
            record,
            expires_at: expiry(meta.ttl),
        };
        self.records.write().insert(key.clone(), stored);
        Ok(())
    }

    async fn remove(&self, key: &Key) -> Result<(), ClientError> {
        self.ensure_connected()?;
        match self.records.write().remove(key) {
            Some(stored) if stored.is_live(Instant::now()) => Ok(()),
            _ => Err(ClientError::NotFound),
        }
    }

    async fn touch(&self, key: &Key, ttl: u64) -> Result<(), ClientError> {
        self.ensure_connected()?;
        let now = Instant::now();
        let mut records = self.records.write();
        match records.get_mut(key) {
            Some(stored) if stored.is_live(now) => {
                stored.expires_at = expiry(Some(ttl));
                Ok(())
            }
            _ => Err(ClientError::NotFound),
        }
    }

    async fn truncate(&self, namespace: &str, set: &str) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.records.write().retain(|key, _| !key.in_set(namespace, set));
        Ok(())
    }

    async fn count(&self, namespace: &str, set: &str) -> Result<usize, ClientError> {
        self.ensure_connected()?;
        let now = Instant::now();
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|(key, stored)| key.in_set(namespace, set) && stored.is_live(now))
            .count())
    }

    async fn close(&self, _flush_pending: bool) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(ClientEvent::Disconnected);
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        Some(self.events.subscribe())
    }
}
