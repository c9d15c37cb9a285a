//! Time-to-live resolution for writes and touches

use crate::config::StoreOptions;
use crate::session::SessionData;

/// TTL in seconds to apply when writing or touching `session`.
///
/// First match wins:
/// 1. TTL disabled in the options: no TTL
/// 2. fixed TTL in the options: that value
/// 3. the session cookie's max age, floored to whole seconds
/// 4. no TTL
///
/// A non-positive result is never returned; it becomes `None`, leaving
/// expiry to the database's own default.
pub fn resolve_ttl(options: &StoreOptions, session: &SessionData) -> Option<u64> {
    if options.disable_ttl {
        return None;
    }

    let ttl = match options.ttl {
        Some(fixed) => fixed,
        None => session.max_age()?.div_euclid(1000),
    };

    u64::try_from(ttl).ok().filter(|&secs| secs > 0)
}
