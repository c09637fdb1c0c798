//! Document content with a newest-first version history.

use chrono::{Duration, Utc};
use shared::{domain::VersionId, protocol::Version};
use thiserror::Error;

use crate::time_format::format_clock;

pub const INITIAL_CONTENT: &str = "# Product Specification: User Onboarding

## Overview
This document outlines the technical requirements for the new user onboarding flow...

## Technical Constraints
- Must use MCP server for auth validation
- Figma designs version 2.4 strictly followed";

pub const AUTOSAVE_LABEL: &str = "Auto-save";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("unknown version {0}")]
    UnknownVersion(VersionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub avatar: String,
}

impl Author {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentState {
    content: String,
    versions: Vec<Version>,
    selected: Option<VersionId>,
    author: Author,
}

impl DocumentState {
    /// Starts from `content` with a single "Initial Draft" version dated an
    /// hour back. Versions saved later are attributed to `author`.
    pub fn new(content: impl Into<String>, author: Author) -> Self {
        let content = content.into();
        let draft = Version {
            id: VersionId::new(),
            content: content.clone(),
            timestamp: Utc::now() - Duration::hours(1),
            author_name: "Alex (PM)".into(),
            author_avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Alex".into(),
            label: Some("Initial Draft".into()),
        };
        Self {
            content,
            versions: vec![draft],
            selected: None,
            author,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Newest first.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }

    /// Whether the content differs from the newest saved version.
    pub fn has_unsaved_changes(&self) -> bool {
        self.latest()
            .map_or(true, |version| version.content != self.content)
    }

    pub fn save_version(&mut self, label: Option<&str>) -> &Version {
        let version = Version {
            id: VersionId::new(),
            content: self.content.clone(),
            timestamp: Utc::now(),
            author_name: self.author.name.clone(),
            author_avatar: self.author.avatar.clone(),
            label: Some(label.unwrap_or(AUTOSAVE_LABEL).to_string()),
        };
        self.versions.insert(0, version);
        &self.versions[0]
    }

    pub fn version(&self, id: VersionId) -> Result<&Version, HistoryError> {
        self.versions
            .iter()
            .find(|version| version.id == id)
            .ok_or(HistoryError::UnknownVersion(id))
    }

    /// Marks a version for preview without touching the content.
    pub fn select_version(&mut self, id: VersionId) -> Result<&Version, HistoryError> {
        let index = self
            .versions
            .iter()
            .position(|version| version.id == id)
            .ok_or(HistoryError::UnknownVersion(id))?;
        self.selected = Some(id);
        Ok(&self.versions[index])
    }

    pub fn selected_version(&self) -> Option<&Version> {
        self.selected.and_then(|id| self.version(id).ok())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Restores the content of `id` and records the restore as a new version.
    pub fn revert_to(&mut self, id: VersionId) -> Result<&Version, HistoryError> {
        let (content, timestamp) = {
            let version = self.version(id)?;
            (version.content.clone(), version.timestamp)
        };
        self.content = content;
        self.selected = None;
        let label = format!("Restored to {}", format_clock(timestamp));
        Ok(self.save_version(Some(&label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author::new("Mike (Dev)", "avatar://mike")
    }

    #[test]
    fn starts_with_initial_draft() {
        let doc = DocumentState::new(INITIAL_CONTENT, author());
        assert_eq!(doc.versions().len(), 1);
        let draft = doc.latest().expect("draft");
        assert_eq!(draft.label.as_deref(), Some("Initial Draft"));
        assert_eq!(draft.content, INITIAL_CONTENT);
        assert!(!doc.has_unsaved_changes());
    }

    #[test]
    fn save_prepends_with_default_label() {
        let mut doc = DocumentState::new("v1", author());
        doc.set_content("v2");
        assert!(doc.has_unsaved_changes());

        let saved = doc.save_version(None).clone();
        assert_eq!(saved.label.as_deref(), Some(AUTOSAVE_LABEL));
        assert_eq!(saved.author_name, "Mike (Dev)");
        assert_eq!(doc.latest(), Some(&saved));
        assert_eq!(doc.versions().len(), 2);
        assert!(!doc.has_unsaved_changes());
    }

    #[test]
    fn revert_restores_content_and_records_restore() {
        let mut doc = DocumentState::new("original", author());
        let draft_id = doc.latest().expect("draft").id;
        doc.set_content("rewritten");
        doc.save_version(Some("Manual"));
        doc.select_version(draft_id).expect("select");

        let restored = doc.revert_to(draft_id).expect("revert").clone();
        assert_eq!(doc.content(), "original");
        assert_eq!(restored.content, "original");
        assert!(restored
            .label
            .as_deref()
            .is_some_and(|label| label.starts_with("Restored to ")));
        assert!(doc.selected_version().is_none());
        assert_eq!(doc.versions().len(), 3);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut doc = DocumentState::new("text", author());
        let missing = VersionId::new();
        assert_eq!(
            doc.revert_to(missing).map(|_| ()),
            Err(HistoryError::UnknownVersion(missing))
        );
        assert!(doc.select_version(missing).is_err());
        assert_eq!(doc.versions().len(), 1);
    }
}
