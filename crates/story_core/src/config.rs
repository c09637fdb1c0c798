use std::{
    fs,
    path::{Path, PathBuf},
};

use bridge_core::{
    config::{parse_override, ENV_PREFIX},
    BridgeSettings, SettingsError,
};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "storyforge.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudioSettings {
    pub bridge: BridgeSettings,
    pub editor: EditorSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub autosave_delay_ms: u64,
    pub author_name: String,
    pub author_avatar: String,
    pub asset_latency_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 5000,
            author_name: "Mike (Dev)".into(),
            author_avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Mike".into(),
            asset_latency_ms: 1200,
        }
    }
}

/// Defaults, then the TOML file, then `STORYFORGE__*` environment variables.
///
/// An explicit `path` must exist; without one, `storyforge.toml` in the
/// working directory is used when present.
pub fn load_settings(path: Option<&Path>) -> Result<StudioSettings, SettingsError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with<F>(
    path: Option<&Path>,
    lookup: F,
) -> Result<StudioSettings, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(SETTINGS_FILE);
            if default_path.exists() {
                read_settings_file(default_path)?
            } else {
                StudioSettings::default()
            }
        }
    };

    settings.bridge.apply_env_overrides(&lookup)?;
    if let Some(v) = lookup(&format!("{ENV_PREFIX}AUTOSAVE_DELAY_MS")) {
        settings.editor.autosave_delay_ms = parse_override("AUTOSAVE_DELAY_MS", &v)?;
    }
    if let Some(v) = lookup(&format!("{ENV_PREFIX}AUTHOR_NAME")) {
        settings.editor.author_name = v;
    }

    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<StudioSettings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
