//! Conversion between session data and stored records
//!
//! A [`DataMapper`] decides how a session is laid out in a database record.
//! The default [`JsonMapper`] stores the whole session as JSON text in one
//! field, which is the format express-session stores use. [`FieldMapper`]
//! spreads top-level session keys over separate record fields instead.

use serde_json::Value;
use std::fmt;

use crate::backend::Record;
use crate::error::StoreError;
use crate::session::SessionData;

/// Record field used by [`JsonMapper`]
pub const SESSION_FIELD: &str = "session";

/// Longest field name [`FieldMapper`] accepts by default
pub const DEFAULT_MAX_FIELD_LEN: usize = 15;

/// Strategy for turning a session into record fields and back
pub trait DataMapper: Send + Sync + fmt::Debug + 'static {
    /// Convert a session into record fields
    fn to_record(&self, session: &SessionData) -> Result<Record, StoreError>;

    /// Convert record fields back into a session.
    ///
    /// `Ok(None)` means the record holds no session.
    fn from_record(&self, record: Record) -> Result<Option<SessionData>, StoreError>;
}

/// Stores the session as JSON text in the `session` field
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapper;

impl DataMapper for JsonMapper {
    fn to_record(&self, session: &SessionData) -> Result<Record, StoreError> {
        let mut record = Record::new();
        record.insert(
            SESSION_FIELD.to_string(),
            Value::String(serde_json::to_string(session)?),
        );
        Ok(record)
    }

    fn from_record(&self, mut record: Record) -> Result<Option<SessionData>, StoreError> {
        match record.remove(SESSION_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(serde_json::from_str(&text)?)),
            Some(other) => Err(StoreError::Serialization(format!(
                "expected JSON text in `{}` field, found {}",
                SESSION_FIELD, other
            ))),
        }
    }
}

/// Stores each top-level session key in its own record field
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    max_field_len: usize,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }

    /// Set the longest field name the target database accepts
    pub fn with_max_field_len(mut self, len: usize) -> Self {
        self.max_field_len = len;
        self
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl DataMapper for FieldMapper {
    fn to_record(&self, session: &SessionData) -> Result<Record, StoreError> {
        let record = match serde_json::to_value(session)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Serialization(format!(
                    "session must serialize to an object, got {}",
                    other
                )))
            }
        };

        if let Some(name) = record.keys().find(|name| name.len() > self.max_field_len) {
            return Err(StoreError::Serialization(format!(
                "field name `{}` is longer than {} characters",
                name, self.max_field_len
            )));
        }

        Ok(record)
    }

    fn from_record(&self, record: Record) -> Result<Option<SessionData>, StoreError> {
        if record.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(Value::Object(record))?))
    }
}
