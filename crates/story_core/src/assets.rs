//! Design-frame browsing and linking over an injected asset source.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    error::{ErrorCode, ServiceError},
    protocol::{DesignFile, DesignFrame},
};
use thiserror::Error;

pub const DEFAULT_ASSET_LATENCY: Duration = Duration::from_millis(1200);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("design url is empty")]
    EmptyUrl,
    #[error("a design fetch is already running")]
    Busy,
    #[error("frame {0} is not part of the fetched design")]
    UnknownFrame(String),
    #[error("design fetch failed: {0}")]
    Fetch(String),
}

impl From<AssetError> for ServiceError {
    fn from(err: AssetError) -> Self {
        let code = match err {
            AssetError::EmptyUrl => ErrorCode::Validation,
            AssetError::Busy => ErrorCode::Busy,
            AssetError::UnknownFrame(_) => ErrorCode::NotFound,
            AssetError::Fetch(_) => ErrorCode::Unavailable,
        };
        ServiceError::new(code, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDesign {
    pub file: DesignFile,
    pub frames: Vec<DesignFrame>,
}

#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDesign>;
}

pub struct MissingAssetSource;

#[async_trait]
impl AssetSource for MissingAssetSource {
    async fn fetch(&self, url: &str) -> Result<FetchedDesign> {
        Err(anyhow!("asset source is unavailable for {url}"))
    }
}

/// Returns a fixed design after a simulated delay.
pub struct MockAssetSource {
    latency: Duration,
}

impl MockAssetSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for MockAssetSource {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_LATENCY)
    }
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn fetch(&self, _url: &str) -> Result<FetchedDesign> {
        tokio::time::sleep(self.latency).await;
        Ok(FetchedDesign {
            file: DesignFile {
                key: "abc123figma".into(),
                name: "Mobile App V2".into(),
                last_modified: Utc::now(),
                thumbnail_url: "https://picsum.photos/seed/figmafile/400/200".into(),
            },
            frames: vec![DesignFrame {
                id: "f1".into(),
                name: "Login Screen".into(),
                thumbnail: "https://picsum.photos/seed/login/400/300".into(),
                description: Some("User login.".into()),
                linked_at: None,
            }],
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct FrameBoard {
    file: Option<DesignFile>,
    available: Vec<DesignFrame>,
    linked: Vec<DesignFrame>,
    fetching: bool,
}

impl FrameBoard {
    pub fn file(&self) -> Option<&DesignFile> {
        self.file.as_ref()
    }

    pub fn available(&self) -> &[DesignFrame] {
        &self.available
    }

    pub fn linked(&self) -> &[DesignFrame] {
        &self.linked
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn begin_fetch(&mut self, url: &str) -> Result<(), AssetError> {
        if url.trim().is_empty() {
            return Err(AssetError::EmptyUrl);
        }
        if self.fetching {
            return Err(AssetError::Busy);
        }
        self.fetching = true;
        Ok(())
    }

    /// Replaces the browsable file and frames. Linked frames are kept.
    pub fn finish_fetch(
        &mut self,
        fetched: Result<FetchedDesign>,
    ) -> Result<&[DesignFrame], AssetError> {
        self.fetching = false;
        let fetched = fetched.map_err(|err| AssetError::Fetch(format!("{err:#}")))?;
        self.file = Some(fetched.file);
        self.available = fetched.frames;
        Ok(&self.available)
    }

    /// Links an available frame. Returns `false` if it was already linked.
    pub fn link(&mut self, frame_id: &str) -> Result<bool, AssetError> {
        if self.linked.iter().any(|frame| frame.id == frame_id) {
            return Ok(false);
        }
        let frame = self
            .available
            .iter()
            .find(|frame| frame.id == frame_id)
            .ok_or_else(|| AssetError::UnknownFrame(frame_id.to_string()))?;
        self.linked.push(DesignFrame {
            linked_at: Some(Utc::now()),
            ..frame.clone()
        });
        Ok(true)
    }

    pub fn unlink(&mut self, frame_id: &str) -> bool {
        let before = self.linked.len();
        self.linked.retain(|frame| frame.id != frame_id);
        self.linked.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fetched_board() -> FrameBoard {
        let mut board = FrameBoard::default();
        board.begin_fetch("https://figma.com/file/abc").expect("begin");
        let fetched = MockAssetSource::new(Duration::ZERO)
            .fetch("https://figma.com/file/abc")
            .await;
        board.finish_fetch(fetched).expect("finish");
        board
    }

    #[tokio::test]
    async fn fetch_populates_file_and_frames() {
        let board = fetched_board().await;
        assert_eq!(board.file().map(|f| f.name.as_str()), Some("Mobile App V2"));
        assert_eq!(board.available().len(), 1);
        assert!(!board.is_fetching());
    }

    #[tokio::test]
    async fn linking_twice_keeps_one_entry() {
        let mut board = fetched_board().await;
        assert_eq!(board.link("f1"), Ok(true));
        assert_eq!(board.link("f1"), Ok(false));
        assert_eq!(board.linked().len(), 1);
        assert!(board.linked()[0].linked_at.is_some());
    }

    #[tokio::test]
    async fn unlink_removes_frame() {
        let mut board = fetched_board().await;
        board.link("f1").expect("link");
        assert!(board.unlink("f1"));
        assert!(!board.unlink("f1"));
        assert!(board.linked().is_empty());
    }

    #[tokio::test]
    async fn unknown_frame_cannot_be_linked() {
        let mut board = fetched_board().await;
        assert_eq!(
            board.link("nope"),
            Err(AssetError::UnknownFrame("nope".into()))
        );
    }

    #[test]
    fn empty_url_and_concurrent_fetch_are_rejected() {
        let mut board = FrameBoard::default();
        assert_eq!(board.begin_fetch("  "), Err(AssetError::EmptyUrl));
        board.begin_fetch("https://figma.com/file/abc").expect("begin");
        assert_eq!(
            board.begin_fetch("https://figma.com/file/abc"),
            Err(AssetError::Busy)
        );
    }

    #[tokio::test]
    async fn failed_fetch_clears_busy_flag() {
        let mut board = FrameBoard::default();
        board.begin_fetch("https://figma.com/file/abc").expect("begin");
        let err = board
            .finish_fetch(MissingAssetSource.fetch("https://figma.com/file/abc").await)
            .expect_err("missing source");
        assert!(matches!(err, AssetError::Fetch(_)));
        assert!(!board.is_fetching());
    }
}
