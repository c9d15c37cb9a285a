//! Session record structure compatible with express-session

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Cookie data attached to an express-session record
///
/// Only the fields that matter for expiry are typed. Everything is optional
/// and unknown attributes are kept in `extra`, so a cookie reads back
/// exactly as it was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    /// Remaining lifetime in milliseconds, when the middleware tracks it directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    /// Original max age in milliseconds (as set initially)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_max_age: Option<i64>,

    /// Expiration time as written by the middleware (RFC 3339 text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,

    /// Secure flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    /// HttpOnly flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,

    /// Cookie path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Cookie domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// SameSite attribute; express-session allows a string or a boolean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<Value>,

    /// Attributes not modelled above, e.g. `priority` or `partitioned`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionCookie {
    /// Cookie that expires `max_age_ms` milliseconds from now
    pub fn with_max_age(max_age_ms: i64) -> Self {
        Self {
            max_age: Some(max_age_ms),
            original_max_age: Some(max_age_ms),
            expires: Some(
                (Utc::now() + chrono::Duration::milliseconds(max_age_ms))
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ..Default::default()
        }
    }

    /// Parsed expiration time; `None` if absent or unparseable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires
            .as_deref()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    /// Remaining time in milliseconds.
    ///
    /// An explicit `maxAge` wins; otherwise it is derived from `expires`.
    /// `None` means a browser-session cookie with no tracked expiry.
    pub fn max_age(&self) -> Option<i64> {
        self.max_age.or_else(|| {
            self.expires_at()
                .map(|exp| (exp - Utc::now()).num_milliseconds())
        })
    }

    /// Check if the cookie has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(exp) => exp < Utc::now(),
            None => false,
        }
    }
}

/// Session data structure compatible with express-session
///
/// User data is flattened at the same level as `cookie`, so the JSON form
/// is exactly what express-session hands to its stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Cookie information, absent when the session tracks no cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<SessionCookie>,

    /// Additional session data
    #[serde(flatten)]
    pub data: HashMap<String, Value>,
}

impl SessionData {
    /// Create session data whose cookie expires in `max_age_ms` milliseconds
    pub fn new(max_age_ms: i64) -> Self {
        Self {
            cookie: Some(SessionCookie::with_max_age(max_age_ms)),
            data: HashMap::new(),
        }
    }

    /// Remaining cookie lifetime in milliseconds, if the session has one
    pub fn max_age(&self) -> Option<i64> {
        self.cookie.as_ref().and_then(SessionCookie::max_age)
    }

    /// Get a value from session data
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in session data
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.to_string(), v);
        }
    }

    /// Remove a value from session data
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Check if session data is empty (no user data)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
