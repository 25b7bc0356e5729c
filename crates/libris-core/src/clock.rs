use chrono::{DateTime, Utc};

/// Current time truncated to whole milliseconds
///
/// Both backends persist timestamps as epoch milliseconds, so values handed
/// out before a write compare equal to the values read back afterwards.
pub fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Decode an epoch-millisecond timestamp, clamping out-of-range values to the epoch
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
