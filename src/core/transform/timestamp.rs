//! Observation timestamp formatting

use chrono::DateTime;

/// Format used for the `@timestamp` field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 9999-12-31T23:59:59Z
pub const MAX_TIMESTAMP_SECONDS: u64 = 253_402_300_799;

/// Renders UNIX seconds as an ISO-8601 UTC string, `YYYY-MM-DDTHH:MM:SSZ`
///
/// Returns `None` past the last second of year 9999, where the four-digit
/// year no longer holds.
///
/// ```
/// use railpos::core::transform::timestamp::format_unix_timestamp;
///
/// assert_eq!(
///     format_unix_timestamp(1_726_500_000).as_deref(),
///     Some("2024-09-16T15:20:00Z")
/// );
/// ```
pub fn format_unix_timestamp(seconds: u64) -> Option<String> {
    if seconds > MAX_TIMESTAMP_SECONDS {
        return None;
    }
    let seconds = i64::try_from(seconds).ok()?;
    let datetime = DateTime::from_timestamp(seconds, 0)?;
    Some(datetime.format(TIMESTAMP_FORMAT).to_string())
}
