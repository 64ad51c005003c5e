//! Timestamp formatting for the store's derived display fields.

use chrono::{DateTime, Local, Utc};

/// Format a message timestamp for the message list (local HH:MM).
/// Missing timestamps degrade to an empty string.
pub fn message_time(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(t) => t.with_timezone(&Local).format("%H:%M").to_string(),
        None => String::new(),
    }
}

/// Human-readable relative last-seen text.
///
/// `now` is passed explicitly so the derivation stays deterministic and
/// testable. Timestamps ahead of `now` (clock skew) clamp to "just now".
pub fn relative_last_seen(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - last_seen).num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else if secs < 172_800 {
        "yesterday".to_string()
    } else {
        last_seen.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_relative_last_seen_buckets() {
        let n = now();
        assert_eq!(relative_last_seen(n - Duration::seconds(10), n), "just now");
        assert_eq!(relative_last_seen(n - Duration::minutes(5), n), "5m ago");
        assert_eq!(relative_last_seen(n - Duration::hours(2), n), "2h ago");
        assert_eq!(relative_last_seen(n - Duration::hours(30), n), "yesterday");
    }

    #[test]
    fn test_relative_last_seen_clock_skew() {
        let n = now();
        // A timestamp from the future must not underflow.
        assert_eq!(relative_last_seen(n + Duration::minutes(3), n), "just now");
    }

    #[test]
    fn test_message_time_missing() {
        assert_eq!(message_time(None), "");
    }
}
