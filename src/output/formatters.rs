//! Formatting helpers for times and durations

use chrono::{DateTime, Duration, Utc};

/// Render an instant in local time, e.g. `01/15/2025 14:30 +09:00`
pub fn format_timestamp_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%m/%d/%Y %H:%M %:z")
        .to_string()
}

/// Render a signed remaining time as `1h 5m`, `4m 10s`, `12s`, or
/// `expired 3m ago`
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return format!("expired {} ago", format_span(secs.unsigned_abs()));
    }
    format_span(secs as u64)
}

fn format_span(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
