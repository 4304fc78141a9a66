use std::io::Write;

use contract_redline::config::{save_theme, Config};
use contract_redline::session::{Session, SessionSettings};
use contract_redline::theme::Theme;

#[test]
fn test_config_file_roundtrip() {
    let toml_content = r#"
theme = "ink"

[diff]
line_lookahead = 3

[history]
max_entries = 2
"#;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    {
        let mut file = std::fs::File::create(&config_path).expect("Failed to create file");
        file.write_all(toml_content.as_bytes())
            .expect("Failed to write");
    }

    let config = Config::load(Some(&config_path)).expect("Failed to load config");
    assert_eq!(config.theme, "ink");
    assert_eq!(config.diff.lines, 3);
    assert_eq!(config.diff.blocks, 5);
    assert_eq!(config.history.max_entries, 2);
}

#[test]
fn test_invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "theme = [").expect("Failed to write");
    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_settings_follow_config() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[history]\nmax_entries = 2\n").expect("Failed to write");
    save_theme("ink", &config_path).expect("Failed to save theme");

    let config = Config::load(Some(&config_path)).expect("Failed to load config");
    let theme = Theme::load(&config.theme).expect("Failed to load theme");
    assert_eq!(theme.name, "Ink");

    let settings = SessionSettings::from_config(&config, &theme);
    assert!(settings.style.deletion_css.contains(&theme.removed_fg.css()));

    // Two snapshots only: the oldest edit falls off.
    let mut session = Session::new(settings);
    session.import("v0");
    session.user_edit("v1");
    session.user_edit("v2");
    assert_eq!(session.undo(), Some("v1"));
    assert_eq!(session.undo(), None);
}
