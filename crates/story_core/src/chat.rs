//! Chat with an injected text generator.
//!
//! A request is split into [`ChatSession::begin`] and
//! [`ChatSession::finish`] so the session lock is not held while the
//! generator runs; a second prompt during that window is refused as busy.

use std::{collections::VecDeque, sync::Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::StoryRole,
    error::{ErrorCode, ServiceError},
    protocol::StoryPart,
};
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "Document updated.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("a reply is already being generated")]
    Busy,
    #[error("text generation failed: {0}")]
    Generation(String),
}

impl From<ChatError> for ServiceError {
    fn from(err: ChatError) -> Self {
        let code = match err {
            ChatError::EmptyPrompt => ErrorCode::Validation,
            ChatError::Busy => ErrorCode::Busy,
            ChatError::Generation(_) => ErrorCode::Unavailable,
        };
        ServiceError::new(code, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: StoryRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub history: Vec<HistoryTurn>,
    pub system_instruction: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

pub struct MissingTextGenerator;

#[async_trait]
impl TextGenerator for MissingTextGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        Err(anyhow!("text generator is unavailable"))
    }
}

/// Replays canned replies in order, then fails.
pub struct ScriptedTextGenerator {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedTextGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        self.replies
            .lock()
            .map_err(|_| anyhow!("scripted replies poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted replies left"))
    }
}

pub fn system_instruction(document: &str) -> String {
    format!("You are StoryForge AI. Current Content: {document}")
}

#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    messages: Vec<StoryPart>,
    generating: bool,
}

impl ChatSession {
    /// Oldest first.
    pub fn messages(&self) -> &[StoryPart] {
        &self.messages
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Records the user prompt and builds the request. History covers the
    /// messages before this prompt.
    pub fn begin(&mut self, prompt: &str, document: &str) -> Result<GenerationRequest, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        if self.generating {
            return Err(ChatError::Busy);
        }

        let history = self
            .messages
            .iter()
            .map(|part| HistoryTurn {
                role: part.role,
                content: part.content.clone(),
            })
            .collect();
        self.messages.push(StoryPart::new(StoryRole::User, prompt));
        self.generating = true;

        Ok(GenerationRequest {
            prompt: prompt.to_string(),
            history,
            system_instruction: system_instruction(document),
        })
    }

    pub fn finish(&mut self, reply: Result<String>) -> Result<StoryPart, ChatError> {
        self.generating = false;
        let text = reply.map_err(|err| ChatError::Generation(format!("{err:#}")))?;
        let text = if text.trim().is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            text
        };
        let part = StoryPart::new(StoryRole::Assistant, text);
        self.messages.push(part.clone());
        Ok(part)
    }
}
