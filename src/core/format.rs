//! Formatting utilities for queue and round timers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Format a queue wait as `MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format the time left before `deadline` as `M:SS`, or `00:00` once passed.
pub fn format_countdown(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = deadline.signed_duration_since(now);
    if remaining.num_milliseconds() <= 0 {
        return "00:00".to_string();
    }
    let secs = remaining.num_seconds();
    format!("{}:{:02}", secs / 60, secs % 60)
}
