use chrono::{DateTime, Utc};

/// Short age label: `Just now`, `{n}m ago`, then the wall-clock `HH:MM`.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp);
    if age.num_seconds() < 60 {
        "Just now".to_string()
    } else if age.num_minutes() < 60 {
        format!("{}m ago", age.num_minutes())
    } else {
        timestamp.format("%H:%M").to_string()
    }
}

pub fn format_clock(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}
