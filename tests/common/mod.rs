#![allow(dead_code)]

use async_trait::async_trait;
use kv_session_store::{
    ClientError, ClientEvent, ClientOptions, Key, KvClient, MemoryClient, Record, SessionData,
    WriteMeta,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn jan() -> SessionData {
    serde_json::from_value(json!({"cookie": {"maxAge": 2000}, "name": "jan"})).unwrap()
}

/// Memory client that counts the requests reaching it
#[derive(Default)]
pub struct CountingClient {
    pub inner: MemoryClient,
    gets: AtomicUsize,
    puts: AtomicUsize,
    removes: AtomicUsize,
    touches: AtomicUsize,
}

impl CountingClient {
    pub fn requests(&self) -> usize {
        self.gets() + self.puts() + self.removes() + self.touches()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvClient for CountingClient {
    fn from_options(_options: &ClientOptions) -> Result<Self, ClientError> {
        Ok(Self::default())
    }

    async fn connect(&self) -> Result<(), ClientError> {
        self.inner.connect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn get(&self, key: &Key) -> Result<Record, ClientError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &Key, record: Record, meta: WriteMeta) -> Result<(), ClientError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, record, meta).await
    }

    async fn remove(&self, key: &Key) -> Result<(), ClientError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn touch(&self, key: &Key, ttl: u64) -> Result<(), ClientError> {
        self.touches.fetch_add(1, Ordering::SeqCst);
        self.inner.touch(key, ttl).await
    }

    async fn truncate(&self, namespace: &str, set: &str) -> Result<(), ClientError> {
        self.inner.truncate(namespace, set).await
    }

    async fn close(&self, flush_pending: bool) {
        self.inner.close(flush_pending).await
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        self.inner.subscribe()
    }
}

/// Client whose server can never be reached
pub struct UnreachableClient;

#[async_trait]
impl KvClient for UnreachableClient {
    fn from_options(_options: &ClientOptions) -> Result<Self, ClientError> {
        Ok(Self)
    }

    async fn connect(&self) -> Result<(), ClientError> {
        Err(ClientError::Timeout("127.0.0.1:3333 did not answer".to_string()))
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn get(&self, _key: &Key) -> Result<Record, ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn put(&self, _key: &Key, _record: Record, _meta: WriteMeta) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn remove(&self, _key: &Key) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn touch(&self, _key: &Key, _ttl: u64) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn truncate(&self, _namespace: &str, _set: &str) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn close(&self, _flush_pending: bool) {}
}

pub const OVERLOAD_CODE: i32 = 18;

/// Client that connects but fails every request server-side
pub struct OverloadedClient;

impl OverloadedClient {
    fn overloaded() -> ClientError {
        ClientError::Server {
            code: OVERLOAD_CODE,
            message: "device overload".to_string(),
        }
    }
}

#[async_trait]
impl KvClient for OverloadedClient {
    fn from_options(_options: &ClientOptions) -> Result<Self, ClientError> {
        Ok(Self)
    }

    async fn connect(&self) -> Result<(), ClientError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn get(&self, _key: &Key) -> Result<Record, ClientError> {
        Err(Self::overloaded())
    }

    async fn put(&self, _key: &Key, _record: Record, _meta: WriteMeta) -> Result<(), ClientError> {
        Err(Self::overloaded())
    }

    async fn remove(&self, _key: &Key) -> Result<(), ClientError> {
        Err(Self::overloaded())
    }

    async fn touch(&self, _key: &Key, _ttl: u64) -> Result<(), ClientError> {
        Err(Self::overloaded())
    }

    async fn truncate(&self, _namespace: &str, _set: &str) -> Result<(), ClientError> {
        Err(Self::overloaded())
    }

    async fn close(&self, _flush_pending: bool) {}
}
