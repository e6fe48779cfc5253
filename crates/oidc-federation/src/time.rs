//! Time utilities.
//!
//! Statement timestamps (`iat`, `exp`) are Unix epoch seconds (i64), as
//! carried in the JWS claims.

use chrono::{DateTime, Utc};

/// Return the current time as seconds since Unix epoch.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Convert epoch seconds to a UTC datetime.
///
/// Out-of-range values clamp to the Unix epoch.
pub fn secs_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert epoch seconds to an RFC 3339 string.
pub fn secs_to_rfc3339(secs: i64) -> String {
    secs_to_datetime(secs).to_rfc3339()
}
