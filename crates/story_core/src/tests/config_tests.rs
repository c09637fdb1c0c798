use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

fn temp_settings_file(name: &str, contents: &str) -> (PathBuf, PathBuf) {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("storyforge_{name}_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("storyforge.toml");
    fs::write(&path, contents).expect("write settings");
    (temp_root, path)
}

#[test]
fn explicit_file_overrides_defaults() {
    let (root, path) = temp_settings_file(
        "explicit",
        r#"
            [bridge]
            log_capacity = 50
            clear_logs_on_connect = true

            [editor]
            autosave_delay_ms = 750
        "#,
    );

    let settings = load_settings_with(Some(path.as_path()), no_env).expect("load");
    assert_eq!(settings.bridge.log_capacity, 50);
    assert!(settings.bridge.clear_logs_on_connect);
    assert_eq!(settings.editor.autosave_delay_ms, 750);
    assert_eq!(settings.editor.author_name, "Mike (Dev)");

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn env_wins_over_file() {
    let (root, path) = temp_settings_file("env", "[bridge]\nlog_capacity = 50\n");
    let vars: HashMap<&str, &str> = [
        ("STORYFORGE__LOG_CAPACITY", "10"),
        ("STORYFORGE__AUTHOR_NAME", "Sarah (Design)"),
    ]
    .into_iter()
    .collect();

    let settings = load_settings_with(Some(path.as_path()), |key| {
        vars.get(key).map(|v| v.to_string())
    })
    .expect("load");
    assert_eq!(settings.bridge.log_capacity, 10);
    assert_eq!(settings.editor.author_name, "Sarah (Design)");

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn custom_handshake_script_is_validated() {
    let (root, path) = temp_settings_file(
        "script",
        r#"
            [bridge.handshake]
            initial_message = "boot"
            initial_log = "starting"

            [[bridge.handshake.steps]]
            at_ms = 100
            progress = 90
            message = "almost"
        "#,
    );

    let err = load_settings_with(Some(path.as_path()), no_env).expect_err("script never completes");
    assert!(matches!(err, SettingsError::Parse { .. }));

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let path = env::temp_dir().join("storyforge_does_not_exist.toml");
    let err = load_settings_with(Some(path.as_path()), no_env).expect_err("missing file");
    assert!(matches!(err, SettingsError::Read { .. }));
}

#[test]
fn bad_env_value_is_reported() {
    let err = load_settings_with(None, |key| {
        (key == "STORYFORGE__AUTOSAVE_DELAY_MS").then(|| "soon".to_string())
    })
    .expect_err("not a number");
    assert!(matches!(err, SettingsError::InvalidOverride { .. }));
}
