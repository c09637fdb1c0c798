use std::{io, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{handshake::HandshakeScript, log_store::DEFAULT_LOG_CAPACITY};

pub const ENV_PREFIX: &str = "STORYFORGE__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub log_capacity: usize,
    pub clear_logs_on_connect: bool,
    /// Multiplier applied to every handshake step offset.
    pub step_delay_scale: f64,
    pub handshake: Option<HandshakeScript>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            clear_logs_on_connect: false,
            step_delay_scale: 1.0,
            handshake: None,
        }
    }
}

impl BridgeSettings {
    /// The configured script (or the default one) with the delay scale applied.
    pub fn script(&self) -> HandshakeScript {
        self.handshake
            .clone()
            .unwrap_or_default()
            .scaled(self.step_delay_scale)
    }

    /// Applies `STORYFORGE__*` overrides resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(&format!("{ENV_PREFIX}LOG_CAPACITY")) {
            self.log_capacity = parse_override("LOG_CAPACITY", &v)?;
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}CLEAR_LOGS_ON_CONNECT")) {
            self.clear_logs_on_connect = parse_override("CLEAR_LOGS_ON_CONNECT", &v)?;
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}STEP_DELAY_SCALE")) {
            self.step_delay_scale = parse_override("STEP_DELAY_SCALE", &v)?;
        }
        Ok(())
    }
}

pub fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| SettingsError::InvalidOverride {
            key: format!("{ENV_PREFIX}{key}"),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.log_capacity, 200);
        assert!(!settings.clear_logs_on_connect);
        assert_eq!(settings.script(), HandshakeScript::default());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut settings = BridgeSettings::default();
        settings
            .apply_env_overrides(env(&[
                ("STORYFORGE__LOG_CAPACITY", "25"),
                ("STORYFORGE__CLEAR_LOGS_ON_CONNECT", "true"),
                ("STORYFORGE__STEP_DELAY_SCALE", " 0.25 "),
            ]))
            .expect("valid overrides");

        assert_eq!(settings.log_capacity, 25);
        assert!(settings.clear_logs_on_connect);
        assert_eq!(settings.script().duration().as_millis(), 1000);
    }

    #[test]
    fn invalid_override_names_the_key() {
        let mut settings = BridgeSettings::default();
        let err = settings
            .apply_env_overrides(env(&[("STORYFORGE__LOG_CAPACITY", "lots")]))
            .expect_err("not a number");
        assert_eq!(
            err.to_string(),
            "invalid value 'lots' for STORYFORGE__LOG_CAPACITY"
        );
    }

    #[test]
    fn parses_partial_toml() {
        let settings: BridgeSettings =
            toml::from_str("clear_logs_on_connect = true").expect("parse");
        assert!(settings.clear_logs_on_connect);
        assert_eq!(settings.log_capacity, 200);
        assert!(settings.handshake.is_none());
    }
}
