//! Redis key-value client
//!
//! Storage layout:
//! - Key: `namespace:set:sid`, each part percent-encoded so `:` and glob
//!   characters cannot cross part boundaries
//! - Value: a Redis hash, one hash field per record field, each holding JSON text
//! - TTL: `EXPIRE` on the hash key

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use redis::RedisResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{ClientEvent, ClientOptions, Key, KvClient, Record, WriteMeta};
use crate::error::ClientError;

const DEFAULT_URL: &str = "redis://127.0.0.1/";

/// Longest TTL sent to Redis; anything larger is clamped and never expires in practice
const MAX_EXPIRE_SECS: i64 = i64::MAX / 2000;

/// Redis-backed key-value client
///
/// The connection manager reconnects on its own, so health is tracked per
/// request: an I/O failure emits `Disconnected` and the next successful
/// request emits `NodeAdded`. Each transition is reported once.
///
/// # Example
///
/// ```rust,ignore
/// use kv_session_store::RedisClient;
///
/// let client = RedisClient::from_url("redis://127.0.0.1/")?;
/// client.connect().await?;
/// ```
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    healthy: Arc<AtomicBool>,
    events: broadcast::Sender<ClientEvent>,
}

impl RedisClient {
    /// Create a new client for the given Redis URL
    pub fn new(client: redis::Client) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            client,
            conn: Arc::new(RwLock::new(None)),
            healthy: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Create a new client from a connection string
    pub fn from_url(url: &str) -> Result<Self, ClientError> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    /// Resolve the connection URL from `url`, or `host` and `port`
    fn url_from_options(options: &ClientOptions) -> String {
        if let Some(url) = options.get("url").and_then(Value::as_str) {
            return url.to_string();
        }
        match options.get("host").and_then(Value::as_str) {
            Some(host) => {
                let port = options.get("port").and_then(Value::as_u64).unwrap_or(6379);
                format!("redis://{}:{}/", host, port)
            }
            None => DEFAULT_URL.to_string(),
        }
    }

    fn make_key(key: &Key) -> String {
        format!(
            "{}:{}:{}",
            urlencoding::encode(&key.namespace),
            urlencoding::encode(&key.set),
            urlencoding::encode(&key.sid)
        )
    }

    // Encoded parts hold no `*`, `?`, `[` or `\`, so only the trailing `*` globs
    fn make_pattern(namespace: &str, set: &str) -> String {
        format!("{}:{}:*", urlencoding::encode(namespace), urlencoding::encode(set))
    }

    /// Track connection health from a request result
    fn observe<T>(&self, result: RedisResult<T>) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                if !self.healthy.swap(true, Ordering::SeqCst) {
                    tracing::debug!("redis connection restored");
                    let _ = self.events.send(ClientEvent::NodeAdded);
                }
                Ok(value)
            }
            Err(e) => {
                let lost = e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal();
                if lost && self.healthy.swap(false, Ordering::SeqCst) {
                    tracing::warn!(error = %e, "redis connection lost");
                    let _ = self.events.send(ClientEvent::Disconnected);
                }
                Err(e.into())
            }
        }
    }

    // Redis rejects an EXPIRE whose deadline overflows milliseconds since the epoch
    fn expire_secs(ttl: u64) -> i64 {
        i64::try_from(ttl).unwrap_or(i64::MAX).min(MAX_EXPIRE_SECS)
    }

    fn connection(&self) -> Result<ConnectionManager, ClientError> {
        self.conn.read().clone().ok_or(ClientError::NotConnected)
    }

    async fn keys_in_set(
        &self,
        conn: &mut ConnectionManager,
        namespace: &str,
        set: &str,
    ) -> Result<Vec<String>, ClientError> {
        self.observe(
            redis::cmd("KEYS")
                .arg(Self::make_pattern(namespace, set))
                .query_async(conn)
                .await,
        )
    }
}

#[async_trait]
impl KvClient for RedisClient {
    fn from_options(options: &ClientOptions) -> Result<Self, ClientError> {
        Self::from_url(&Self::url_from_options(options))
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }
        let manager = ConnectionManager::new(self.client.clone()).await?;
        *self.conn.write() = Some(manager);
        self.healthy.store(true, Ordering::SeqCst);
        let _ = self.events.send(ClientEvent::NodeAdded);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.read().is_some()
    }

    async fn get(&self, key: &Key) -> Result<Record, ClientError> {
        let mut conn = self.connection()?;
        let fields: HashMap<String, String> =
            self.observe(conn.hgetall(Self::make_key(key)).await)?;

        if fields.is_empty() {
            return Err(ClientError::NotFound);
        }

        fields
            .into_iter()
            .map(|(name, text)| {
                serde_json::from_str::<Value>(&text)
                    .map(|value| (name.clone(), value))
                    .map_err(|e| ClientError::Protocol(format!("field `{}`: {}", name, e)))
            })
            .collect()
    }

    async fn put(&self, key: &Key, record: Record, meta: WriteMeta) -> Result<(), ClientError> {
        let mut conn = self.connection()?;
        let redis_key = Self::make_key(key);

        let items: Vec<(String, String)> = record
            .into_iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();

        let mut pipe = redis::pipe();
        pipe.atomic().del(&redis_key).ignore();
        if !items.is_empty() {
            pipe.hset_multiple(&redis_key, &items).ignore();
            if let Some(ttl) = meta.ttl {
                pipe.expire(&redis_key, Self::expire_secs(ttl)).ignore();
            }
        }
        let _: () = self.observe(pipe.query_async(&mut conn).await)?;
        Ok(())
    }

    async fn remove(&self, key: &Key) -> Result<(), ClientError> {
        let mut conn = self.connection()?;
        let removed: i64 = self.observe(conn.del(Self::make_key(key)).await)?;
        if removed == 0 {
            return Err(ClientError::NotFound);
        }
        Ok(())
    }

    async fn touch(&self, key: &Key, ttl: u64) -> Result<(), ClientError> {
        let mut conn = self.connection()?;
        // EXPIRE returns false when the key does not exist
        let found: bool =
            self.observe(conn.expire(Self::make_key(key), Self::expire_secs(ttl)).await)?;
        if !found {
            return Err(ClientError::NotFound);
        }
        Ok(())
    }

    async fn truncate(&self, namespace: &str, set: &str) -> Result<(), ClientError> {
        let mut conn = self.connection()?;
        let keys = self.keys_in_set(&mut conn, namespace, set).await?;
        if !keys.is_empty() {
            self.observe(conn.del::<_, ()>(keys).await)?;
        }
        Ok(())
    }

    async fn count(&self, namespace: &str, set: &str) -> Result<usize, ClientError> {
        let mut conn = self.connection()?;
        let keys = self.keys_in_set(&mut conn, namespace, set).await?;
        Ok(keys.len())
    }

    async fn close(&self, _flush_pending: bool) {
        // Dropping the manager closes the connection once in-flight clones finish
        self.healthy.store(false, Ordering::SeqCst);
        if self.conn.write().take().is_some() {
            let _ = self.events.send(ClientEvent::Disconnected);
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        Some(self.events.subscribe())
    }
}
