//! Application state for one editing session.

use std::{sync::Arc, time::Duration};

use bridge_core::{BridgeController, BridgeHandle};
use shared::{
    domain::VersionId,
    protocol::{DesignFrame, StoryPart, Version},
};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    assets::{AssetError, AssetSource, FrameBoard, MockAssetSource},
    autosave::Autosaver,
    chat::{ChatError, ChatSession, MissingTextGenerator, TextGenerator},
    config::StudioSettings,
    document::{Author, DocumentState, HistoryError, INITIAL_CONTENT},
};

pub struct StudioSession {
    bridge: Arc<dyn BridgeHandle>,
    document: Arc<Mutex<DocumentState>>,
    autosaver: Autosaver,
    chat: Mutex<ChatSession>,
    frames: Mutex<FrameBoard>,
    generator: Arc<dyn TextGenerator>,
    assets: Arc<dyn AssetSource>,
}

impl StudioSession {
    pub fn new(settings: &StudioSettings) -> Self {
        Self::new_with_dependencies(
            settings,
            Arc::new(BridgeController::new(&settings.bridge)),
            Arc::new(MissingTextGenerator),
            Arc::new(MockAssetSource::new(Duration::from_millis(
                settings.editor.asset_latency_ms,
            ))),
        )
    }

    pub fn new_with_dependencies(
        settings: &StudioSettings,
        bridge: Arc<dyn BridgeHandle>,
        generator: Arc<dyn TextGenerator>,
        assets: Arc<dyn AssetSource>,
    ) -> Self {
        let author = Author::new(
            settings.editor.author_name.clone(),
            settings.editor.author_avatar.clone(),
        );
        let document = Arc::new(Mutex::new(DocumentState::new(INITIAL_CONTENT, author)));
        let autosaver = Autosaver::new(
            Arc::clone(&document),
            Duration::from_millis(settings.editor.autosave_delay_ms),
        );
        Self {
            bridge,
            document,
            autosaver,
            chat: Mutex::new(ChatSession::default()),
            frames: Mutex::new(FrameBoard::default()),
            generator,
            assets,
        }
    }

    pub fn bridge(&self) -> &Arc<dyn BridgeHandle> {
        &self.bridge
    }

    pub async fn document(&self) -> DocumentState {
        self.document.lock().await.clone()
    }

    pub async fn edit_document(&self, content: impl Into<String>) {
        self.document.lock().await.set_content(content);
        self.autosaver.schedule();
    }

    pub async fn save_version(&self, label: Option<&str>) -> Version {
        self.autosaver.cancel();
        let mut doc = self.document.lock().await;
        let version = doc.save_version(label).clone();
        info!(version = %version.id, label = ?version.label, "studio: version saved");
        version
    }

    pub async fn revert_to(&self, id: VersionId) -> Result<Version, HistoryError> {
        self.autosaver.cancel();
        let mut doc = self.document.lock().await;
        let version = doc.revert_to(id)?.clone();
        info!(restored = %id, version = %version.id, "studio: document reverted");
        Ok(version)
    }

    pub async fn send_chat(&self, prompt: &str) -> Result<StoryPart, ChatError> {
        let content = self.document.lock().await.content().to_string();
        let request = self.chat.lock().await.begin(prompt, &content)?;

        let reply = self.generator.generate(request).await;
        if let Err(err) = &reply {
            error!("studio: text generation failed: {err:#}");
        }
        self.chat.lock().await.finish(reply)
    }

    pub async fn chat_messages(&self) -> Vec<StoryPart> {
        self.chat.lock().await.messages().to_vec()
    }

    pub async fn fetch_frames(&self, url: &str) -> Result<Vec<DesignFrame>, AssetError> {
        self.frames.lock().await.begin_fetch(url)?;

        let fetched = self.assets.fetch(url).await;
        if let Err(err) = &fetched {
            error!(url, "studio: design fetch failed: {err:#}");
        }
        let mut frames = self.frames.lock().await;
        Ok(frames.finish_fetch(fetched)?.to_vec())
    }

    pub async fn link_frame(&self, frame_id: &str) -> Result<bool, AssetError> {
        self.frames.lock().await.link(frame_id)
    }

    pub async fn unlink_frame(&self, frame_id: &str) -> bool {
        self.frames.lock().await.unlink(frame_id)
    }

    pub async fn linked_frames(&self) -> Vec<DesignFrame> {
        self.frames.lock().await.linked().to_vec()
    }
}

#[cfg(test)]
#[path = "tests/studio_tests.rs"]
mod tests;
