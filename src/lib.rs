//! # kv-session-store
//!
//! Express-session compatible session store for key-value databases.
//!
//! This crate persists express-session records through a key-value database
//! client, in the same layout Node.js session stores use, so Rust and Node.js
//! applications can share sessions.
//!
//! ## Features
//!
//! - **Express-session compatible records**: Sessions are stored as the JSON express-session produces
//! - **Cookie-driven expiry**: Record TTL follows a fixed TTL, or the session cookie's max age
//! - **Pluggable record layout**: Single JSON field by default, or one field per session key
//! - **Pluggable databases**: Redis, Memory, or any custom [`KvClient`]
//! - **Lifecycle notifications**: Subscribe to connect/disconnect events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kv_session_store::{KvSessionStore, RedisClient, SessionData, SessionStore, StoreOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kv_session_store::StoreError> {
//!     let options = StoreOptions::new()
//!         .with_namespace("express")
//!         .with_set("session")
//!         .with_ttl(86400)
//!         .with_client_option("url", "redis://127.0.0.1/");
//!
//!     let store: KvSessionStore<RedisClient> = KvSessionStore::new(options)?;
//!     store.connect().await?;
//!
//!     let mut session = SessionData::new(3_600_000);
//!     session.set("views", 1);
//!     store.set("some-session-id", &session).await?;
//!
//!     let loaded = store.get("some-session-id").await?;
//!     assert_eq!(loaded, Some(session));
//!
//!     store.close().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod mapper;
pub mod session;
pub mod store;
pub mod ttl;

pub use backend::{ClientEvent, ClientOptions, Key, KvClient, MemoryClient, Record, WriteMeta};
pub use config::StoreOptions;
pub use error::{ClientError, StoreError};
pub use mapper::{DataMapper, FieldMapper, JsonMapper};
pub use session::{SessionCookie, SessionData};
pub use store::{ConnectionState, KvSessionStore, SessionStore, StoreEvent};
pub use ttl::resolve_ttl;

#[cfg(feature = "redis-store")]
pub use backend::RedisClient;
