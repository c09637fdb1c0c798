//! Plain-text rendering of bridge snapshots for the terminal.

use bridge_core::{Affordances, BridgeSnapshot, Tone};
use shared::protocol::LogEntry;

fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => " ",
        Tone::Pending => "~",
        Tone::Success => "+",
        Tone::Danger => "!",
    }
}

pub fn status_line(snapshot: &BridgeSnapshot) -> String {
    let affordances = Affordances::from_snapshot(snapshot);
    let mut line = format!(
        "{} [{}] {}",
        tone_marker(affordances.tone),
        snapshot.connection_state,
        snapshot.status_message
    );
    if affordances.show_progress {
        line.push_str(&format!(" ({}%)", snapshot.progress));
    }
    if let Some(action) = affordances.primary_action {
        if action.is_interactive() {
            line.push_str(&format!(" -> {}", action.label()));
        }
    }
    line
}

pub fn log_line(entry: &LogEntry) -> String {
    format!(
        "{} {} {:<7} {}",
        tone_marker(entry.severity.into()),
        entry.timestamp.format("%H:%M:%S"),
        entry.severity,
        entry.message
    )
}

/// Oldest first, the way a terminal scrolls.
pub fn log_lines(snapshot: &BridgeSnapshot) -> Vec<String> {
    if snapshot.logs.is_empty() {
        return vec!["Listening for events...".to_string()];
    }
    snapshot.logs.iter().rev().map(log_line).collect()
}
