//! Session store backed by a key-value database client
//!
//! Every operation is a single request to the [`KvClient`]. The store only
//! maps session IDs to keys, runs the [`DataMapper`](crate::DataMapper) and
//! works out TTLs; retries and reconnects are the client's business.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::lifecycle::{spawn_watcher, ConnectionState, Lifecycle, StoreEvent};
use super::SessionStore;
use crate::backend::{Key, KvClient, WriteMeta};
use crate::config::StoreOptions;
use crate::error::{ClientError, StoreError};
use crate::session::SessionData;
use crate::ttl::resolve_ttl;

struct Inner<C> {
    client: Arc<C>,
    owns_client: bool,
    options: StoreOptions,
    lifecycle: Arc<Lifecycle>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Express-session store over a [`KvClient`]
///
/// Records are addressed as `(namespace, set, sid)`. A store built with
/// [`new`](Self::new) owns its client and closes it on [`close`](Self::close);
/// one built with [`with_client`](Self::with_client) borrows the client and
/// leaves its lifecycle to the caller.
///
/// # Example
///
/// ```rust,ignore
/// use kv_session_store::{KvSessionStore, MemoryClient, SessionStore, StoreOptions};
///
/// let store: KvSessionStore<MemoryClient> =
///     KvSessionStore::new(StoreOptions::new().with_set("session").with_ttl(3600))?;
/// store.connect().await?;
/// let session = store.get("sid").await?;
/// ```
pub struct KvSessionStore<C: KvClient> {
    inner: Arc<Inner<C>>,
}

impl<C: KvClient> KvSessionStore<C> {
    /// Create a store that builds and owns its client.
    ///
    /// The client is not connected until [`connect`](Self::connect).
    pub fn new(options: StoreOptions) -> Result<Self, StoreError> {
        options.validate()?;
        let client = C::from_options(&options.client)
            .map_err(|e| StoreError::Construction(format!("failed to create client: {}", e)))?;
        Ok(Self::build(options, Arc::new(client), true))
    }

    /// Create a store over an existing client, which it will never close
    pub fn with_client(options: StoreOptions, client: Arc<C>) -> Result<Self, StoreError> {
        options.validate()?;
        Ok(Self::build(options, client, false))
    }

    fn build(options: StoreOptions, client: Arc<C>, owns_client: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                owns_client,
                options,
                lifecycle: Arc::new(Lifecycle::new()),
                watcher: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Bring the store online.
    ///
    /// An owned client is connected here; a borrowed one must already be
    /// connected by its owner. Emits [`StoreEvent::Connect`] on success and
    /// [`StoreEvent::Disconnect`] on failure. Calling this while connected
    /// or connecting does nothing.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !self.inner.lifecycle.begin_connect() {
            return Ok(());
        }
        self.watch_client();

        let result = if self.inner.owns_client {
            self.inner.client.connect().await
        } else if self.inner.client.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        };

        match result {
            Ok(()) => {
                debug!(namespace = %self.inner.options.namespace, set = %self.inner.options.set, "connected");
                self.inner.lifecycle.mark_connected();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to connect");
                self.inner.lifecycle.mark_disconnected();
                Err(e.into())
            }
        }
    }

    fn watch_client(&self) {
        let mut watcher = self.inner.watcher.lock();
        if watcher.is_some() {
            return;
        }
        if let Some(events) = self.inner.client.subscribe() {
            *watcher = Some(spawn_watcher(Arc::clone(&self.inner.lifecycle), events));
        }
    }

    /// Release the connection, flushing pending client work
    pub async fn close(&self) {
        self.close_with(true).await;
    }

    /// Release the connection.
    ///
    /// A borrowed client is left open. Emits [`StoreEvent::Disconnect`] if
    /// the store was connected. Further operations fail with
    /// [`StoreError::Closed`]; closing twice does nothing.
    pub async fn close_with(&self, flush_pending: bool) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let watcher = self.inner.watcher.lock().take();
        if let Some(handle) = watcher {
            handle.abort();
        }
        if self.inner.owns_client {
            self.inner.client.close(flush_pending).await;
        }
        debug!("closed");
        self.inner.lifecycle.mark_disconnected();
    }

    /// Subscribe to connect/disconnect notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.lifecycle.subscribe()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.lifecycle.state()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// The underlying database client
    pub fn client(&self) -> &Arc<C> {
        &self.inner.client
    }

    /// Whether the store closes the client on [`close`](Self::close)
    pub fn owns_client(&self) -> bool {
        self.inner.owns_client
    }

    /// Destroy a session without waiting for the result.
    ///
    /// There is nobody to report a failure to, so errors are logged.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the removal runs on
    /// a spawned task.
    pub fn destroy_detached(&self, sid: &str) -> JoinHandle<()> {
        let store = self.clone();
        let sid = sid.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.destroy(&sid).await {
                warn!(sid = %sid, error = %e, "failed to destroy session");
            }
        })
    }

    fn key(&self, sid: &str) -> Key {
        Key::new(&self.inner.options.namespace, &self.inner.options.set, sid)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl<C: KvClient> Clone for KvSessionStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<C: KvClient> SessionStore for KvSessionStore<C> {
    async fn get(&self, sid: &str) -> Result<Option<SessionData>, StoreError> {
        self.ensure_open()?;
        let key = self.key(sid);
        debug!(sid, "GET");

        let record = match self.inner.client.get(&key).await {
            Ok(record) => record,
            Err(ClientError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.inner.options.mapper.from_record(record)
    }

    async fn set(&self, sid: &str, session: &SessionData) -> Result<(), StoreError> {
        self.ensure_open()?;
        let key = self.key(sid);
        let record = self.inner.options.mapper.to_record(session)?;
        let ttl = resolve_ttl(&self.inner.options, session);
        debug!(sid, ttl = ?ttl, "PUT");

        self.inner.client.put(&key, record, WriteMeta { ttl }).await?;
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let key = self.key(sid);
        debug!(sid, "REMOVE");

        match self.inner.client.remove(&key).await {
            Ok(()) | Err(ClientError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn touch(&self, sid: &str, session: &SessionData) -> Result<(), StoreError> {
        self.ensure_open()?;
        match resolve_ttl(&self.inner.options, session) {
            Some(ttl) => {
                let key = self.key(sid);
                debug!(sid, ttl, "TOUCH");
                self.inner.client.touch(&key, ttl).await?;
            }
            None => {
                // Still complete asynchronously, after already queued work
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let options = &self.inner.options;
        debug!(namespace = %options.namespace, set = %options.set, "TRUNCATE");
        self.inner.client.truncate(&options.namespace, &options.set).await?;
        Ok(())
    }

    async fn length(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let options = &self.inner.options;
        Ok(self.inner.client.count(&options.namespace, &options.set).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryClient;
    use crate::mapper::FieldMapper;
    use serde_json::json;
    use std::time::Duration;

    fn session() -> SessionData {
        serde_json::from_value(json!({"cookie": {"maxAge": 2000}, "name": "jan"})).unwrap()
    }

    async fn connected(options: StoreOptions) -> KvSessionStore<MemoryClient> {
        let store = KvSessionStore::new(options).unwrap();
        store.connect().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_set_writes_cookie_ttl() {
        let store = connected(StoreOptions::default()).await;
        store.set("sid", &session()).await.unwrap();

        let ttl = store.client().ttl_of(&store.key("sid")).unwrap();
        assert!(ttl <= Duration::from_secs(2) && ttl > Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_set_without_ttl() {
        let store = connected(StoreOptions::default().with_disable_ttl(true)).await;
        store.set("sid", &session()).await.unwrap();
        assert_eq!(store.client().ttl_of(&store.key("sid")), None);
        assert_eq!(store.get("sid").await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_touch_without_ttl_skips_database() {
        let store = connected(StoreOptions::default()).await;
        // Never written, so a real touch would report NotFound
        store.touch("missing", &SessionData::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_touch_missing_record_propagates() {
        let store = connected(StoreOptions::default()).await;
        let err = store.touch("missing", &session()).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(ClientError::NotFound)));
    }

    #[tokio::test]
    async fn test_field_mapper_layout() {
        let store = connected(StoreOptions::default().with_mapper(FieldMapper::new())).await;
        store.set("sid", &session()).await.unwrap();

        let record = store.client().get(&store.key("sid")).await.unwrap();
        assert_eq!(record["name"], json!("jan"));
        assert_eq!(store.get("sid").await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_keys_are_scoped_by_set() {
        let client = Arc::new(MemoryClient::new());
        client.connect().await.unwrap();
        let a = KvSessionStore::with_client(StoreOptions::default().with_set("a"), Arc::clone(&client)).unwrap();
        let b = KvSessionStore::with_client(StoreOptions::default().with_set("b"), Arc::clone(&client)).unwrap();

        a.set("sid", &session()).await.unwrap();
        assert!(b.get("sid").await.unwrap().is_none());
        b.clear().await.unwrap();
        assert!(a.get("sid").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_construction_validates_options() {
        let result = KvSessionStore::<MemoryClient>::new(StoreOptions::default().with_namespace(""));
        assert!(matches!(result, Err(StoreError::Construction(_))));
    }

    #[test]
    #[should_panic]
    fn test_detached_destroy_needs_runtime() {
        let store = KvSessionStore::<MemoryClient>::new(StoreOptions::default()).unwrap();
        let _ = store.destroy_detached("sid");
    }
}
