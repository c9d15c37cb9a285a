//! Session store implementations

mod kv_store;
mod lifecycle;
mod traits;

pub use kv_store::KvSessionStore;
pub use lifecycle::{ConnectionState, StoreEvent};
pub use traits::SessionStore;
