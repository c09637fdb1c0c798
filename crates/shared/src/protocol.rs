use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LogEntryId, LogSeverity, MessageId, StoryRole, VersionId};

/// One line of the bridge session log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub severity: LogSeverity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: LogSeverity) -> Self {
        Self {
            id: LogEntryId::new(),
            message: message.into(),
            timestamp: Utc::now(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author_name: String,
    pub author_avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPart {
    pub id: MessageId,
    pub role: StoryRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_ref: Option<String>,
}

impl StoryPart {
    pub fn new(role: StoryRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            frame_ref: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFile {
    pub key: String,
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFrame {
    pub id: String,
    pub name: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<DateTime<Utc>>,
}
