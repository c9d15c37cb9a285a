//! Session store configuration

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::backend::ClientOptions;
use crate::error::StoreError;
use crate::mapper::{DataMapper, JsonMapper};

/// Options recognized by the session store.
///
/// Unknown keys are kept in [`client`](Self::client) and handed to the
/// database client when the store builds its own.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Namespace holding the session records (default: "test")
    pub namespace: String,

    /// Set (collection) holding the session records (default: "express-session")
    pub set: String,

    /// Fixed TTL in seconds, overriding the cookie max age (default: None)
    pub ttl: Option<i64>,

    /// Never send a TTL; the database default applies (default: false)
    #[serde(rename = "disableTTL", alias = "disableTtl")]
    pub disable_ttl: bool,

    /// Record layout strategy (default: [`JsonMapper`])
    #[serde(skip, default = "default_mapper")]
    pub mapper: Arc<dyn DataMapper>,

    /// Connection options passed through to client construction
    #[serde(flatten)]
    pub client: ClientOptions,
}

fn default_mapper() -> Arc<dyn DataMapper> {
    Arc::new(JsonMapper)
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            namespace: "test".to_string(),
            set: "express-session".to_string(),
            ttl: None,
            disable_ttl: false,
            mapper: default_mapper(),
            client: ClientOptions::new(),
        }
    }
}

impl StoreOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object, e.g. a section of a config file
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Construction(format!(
                    "options must be an object, got {}",
                    other
                )))
            }
        };

        if map.contains_key("serializer") {
            return Err(StoreError::Construction(
                "the `serializer` option is no longer supported, use a mapper instead".to_string(),
            ));
        }

        let options: StoreOptions = serde_json::from_value(Value::Object(map))
            .map_err(|e| StoreError::Construction(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the namespace (default: "test")
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the set name (default: "express-session")
    pub fn with_set<S: Into<String>>(mut self, set: S) -> Self {
        self.set = set.into();
        self
    }

    /// Set a fixed TTL in seconds
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set whether TTLs are disabled (default: false)
    pub fn with_disable_ttl(mut self, disable: bool) -> Self {
        self.disable_ttl = disable;
        self
    }

    /// Use a custom record layout
    pub fn with_mapper<M: DataMapper>(mut self, mapper: M) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }

    /// Add a connection option for the database client
    pub fn with_client_option<S: Into<String>>(mut self, name: S, value: impl Into<Value>) -> Self {
        self.client.insert(name.into(), value.into());
        self
    }

    /// Check the options before any connection attempt
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.namespace.is_empty() {
            return Err(StoreError::Construction("namespace must not be empty".to_string()));
        }
        if self.set.is_empty() {
            return Err(StoreError::Construction("set must not be empty".to_string()));
        }
        Ok(())
    }
}
