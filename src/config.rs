use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::diff::Lookahead;
use crate::highlight::EXCERPT_CHAR_LIMIT;
use crate::history::MAX_ENTRIES;
use crate::theme::DEFAULT_THEME_NAME;

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "contract-redline";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    /// Lookahead windows; tunable, not canonical.
    pub diff: Lookahead,
    pub highlight: HighlightConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Excerpts are cut to this many characters before matching.
    pub excerpt_limit: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME_NAME.to_string(),
            diff: Lookahead::default(),
            highlight: HighlightConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            excerpt_limit: EXCERPT_CHAR_LIMIT,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRIES,
        }
    }
}

impl Config {
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_path(),
        };

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;

        config.validate()?;
        tracing::debug!(path = %config_path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=1000).contains(&self.diff.lines),
            "diff.line_lookahead must be between 1 and 1000"
        );
        anyhow::ensure!(
            (1..=1000).contains(&self.diff.blocks),
            "diff.block_lookahead must be between 1 and 1000"
        );
        anyhow::ensure!(
            self.highlight.excerpt_limit >= 1,
            "highlight.excerpt_limit must be at least 1"
        );
        anyhow::ensure!(
            self.history.max_entries >= 2,
            "history.max_entries must be at least 2"
        );
        Ok(())
    }
}

/// Save the selected theme name to the config file.
/// Preserves all other config values. Creates the file and parent dirs if needed.
pub fn save_theme(theme_name: &str, path: &Path) -> Result<()> {
    use std::collections::BTreeMap;

    // Read existing config as a generic TOML table (preserves unknown fields)
    let mut table: BTreeMap<String, toml::Value> = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&content).unwrap_or_default()
    } else {
        BTreeMap::new()
    };

    table.insert(
        "theme".to_string(),
        toml::Value::String(theme_name.to_string()),
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(&table).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{BLOCK_LOOKAHEAD, LINE_LOOKAHEAD};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme, "paper");
        assert_eq!(config.diff.lines, LINE_LOOKAHEAD);
        assert_eq!(config.diff.blocks, BLOCK_LOOKAHEAD);
        assert_eq!(config.highlight.excerpt_limit, 500);
        assert_eq!(config.history.max_entries, MAX_ENTRIES);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            theme = "ink"

            [diff]
            line_lookahead = 25
            block_lookahead = 8

            [highlight]
            excerpt_limit = 200

            [history]
            max_entries = 50
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.theme, "ink");
        assert_eq!(config.diff.lines, 25);
        assert_eq!(config.diff.blocks, 8);
        assert_eq!(config.highlight.excerpt_limit, 200);
        assert_eq!(config.history.max_entries, 50);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [diff]
            block_lookahead = 3
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.theme, "paper");
        assert_eq!(config.diff.lines, LINE_LOOKAHEAD);
        assert_eq!(config.diff.blocks, 3);
    }

    #[test]
    fn test_validation_lookahead() {
        let config = Config {
            diff: Lookahead {
                lines: 0,
                blocks: 5,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_history() {
        let config = Config {
            history: HistoryConfig { max_entries: 1 },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config = Config::load(Some(&PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.theme, "paper");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[highlight]\nexcerpt_limit = 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_save_theme_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save_theme("ink", &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("theme = \"ink\""));
    }

    #[test]
    fn test_save_theme_preserves_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = \"paper\"\n\n[diff]\nline_lookahead = 12\n").unwrap();
        save_theme("ink", &path).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.theme, "ink");
        assert_eq!(config.diff.lines, 12);
    }
}
