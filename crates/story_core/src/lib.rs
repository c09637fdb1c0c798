//! Editing-session state around the tool bridge: document history with
//! autosave, chat over an injected text generator and design-frame linking.

pub mod assets;
pub mod autosave;
pub mod chat;
pub mod config;
pub mod document;
pub mod studio;
pub mod time_format;

pub use assets::{
    AssetError, AssetSource, FetchedDesign, FrameBoard, MissingAssetSource, MockAssetSource,
};
pub use chat::{
    ChatError, ChatSession, GenerationRequest, MissingTextGenerator, ScriptedTextGenerator,
    TextGenerator,
};
pub use config::{load_settings, EditorSettings, StudioSettings};
pub use document::{Author, DocumentState, HistoryError};
pub use studio::StudioSession;
