//! Error types for the session store and its database clients

use thiserror::Error;

/// Errors reported by a [`KvClient`](crate::backend::KvClient).
///
/// `NotFound` is kept distinct from every other failure so the store can
/// turn it into an absent session on reads and an idempotent delete.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The addressed record does not exist (or has expired)
    #[error("Record not found")]
    NotFound,
    /// The client has no live connection
    #[error("Not connected")]
    NotConnected,
    /// The request did not complete in time
    #[error("Operation timed out: {0}")]
    Timeout(String),
    /// Server-side failure, with the database's own status code
    #[error("Server error {code}: {message}")]
    Server { code: i32, message: String },
    /// A stored value could not be decoded by the client
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// The backend does not implement this primitive
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
    /// Redis error (when redis-store feature is enabled)
    #[cfg(feature = "redis-store")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl ClientError {
    /// Whether this is the "record not found" status
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

/// Errors that can occur during session store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database failure, passed through unchanged
    #[error(transparent)]
    Database(#[from] ClientError),
    /// Error during serialization/deserialization of a session
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Invalid configuration, raised before any connection attempt
    #[error("Invalid store configuration: {0}")]
    Construction(String),
    /// The store has been closed
    #[error("Session store is closed")]
    Closed,
    /// Optional store capability that is not implemented
    #[error("{0} not implemented")]
    Unsupported(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_keeps_message() {
        let err = StoreError::from(ClientError::Server {
            code: 9,
            message: "device overload".to_string(),
        });
        assert_eq!(err.to_string(), "Server error 9: device overload");
        assert!(matches!(err, StoreError::Database(ClientError::Server { code: 9, .. })));
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(ClientError::NotFound.is_not_found());
        assert!(!ClientError::NotConnected.is_not_found());
    }
}
