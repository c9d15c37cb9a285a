//! Session store trait

use async_trait::async_trait;
use crate::error::StoreError;
use crate::session::SessionData;

/// Trait for session storage backends
///
/// This mirrors the express-session store interface. Stores work out the
/// record TTL themselves from their configuration and the session cookie.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Get a session by ID
    ///
    /// Returns None if session doesn't exist
    async fn get(&self, sid: &str) -> Result<Option<SessionData>, StoreError>;

    /// Set/update a session
    async fn set(&self, sid: &str, session: &SessionData) -> Result<(), StoreError>;

    /// Destroy/delete a session
    ///
    /// Destroying a session that doesn't exist is not an error.
    async fn destroy(&self, sid: &str) -> Result<(), StoreError>;

    /// Touch a session - update its TTL without modifying data
    async fn touch(&self, sid: &str, session: &SessionData) -> Result<(), StoreError>;

    /// Clear all sessions (optional)
    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("clear"))
    }

    /// Get the count of all sessions (optional)
    async fn length(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unsupported("length"))
    }
}
