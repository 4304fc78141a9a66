use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::APP_DIR;

pub const DEFAULT_THEME_NAME: &str = "paper";

/// Themes compiled into the binary, looked up after the on-disk locations.
const BUNDLED: &[(&str, &str)] = &[
    ("paper", include_str!("../themes/paper.toml")),
    ("ink", include_str!("../themes/ink.toml")),
];

#[derive(Debug, Deserialize)]
pub struct ThemeFile {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Debug, Deserialize)]
pub struct ThemeColors {
    pub text: String,
    pub muted: String,

    pub added_fg: String,
    pub added_bg: String,
    pub added_border: String,

    pub removed_fg: String,
    pub removed_bg: String,

    pub highlight_fg: String,
    pub highlight_bg: String,
}

/// An sRGB colour usable both as CSS and as a terminal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl From<Rgb> for crossterm::style::Color {
    fn from(c: Rgb) -> Self {
        crossterm::style::Color::Rgb {
            r: c.0,
            g: c.1,
            b: c.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub text: Rgb,
    pub muted: Rgb,

    pub added_fg: Rgb,
    pub added_bg: Rgb,
    pub added_border: Rgb,

    pub removed_fg: Rgb,
    pub removed_bg: Rgb,

    pub highlight_fg: Rgb,
    pub highlight_bg: Rgb,
}

impl Theme {
    pub fn load(name: &str) -> Result<Self> {
        // Themes directory next to the binary
        let theme_path = Self::theme_path(name);
        if theme_path.exists() {
            let content = std::fs::read_to_string(&theme_path)
                .with_context(|| format!("Failed to read theme {}", theme_path.display()))?;
            return Self::from_toml(&content);
        }

        // User config directory
        let user_theme = Self::user_theme_dir().join(format!("{name}.toml"));
        if user_theme.exists() {
            let content = std::fs::read_to_string(&user_theme)
                .with_context(|| format!("Failed to read theme {}", user_theme.display()))?;
            return Self::from_toml(&content);
        }

        if let Some((_, content)) = BUNDLED.iter().find(|(bundled, _)| *bundled == name) {
            return Self::from_toml(content);
        }

        anyhow::bail!("Theme '{}' not found", name);
    }

    pub fn default_theme() -> Self {
        Self::from_toml(BUNDLED[0].1).expect("embedded default theme must be valid")
    }

    /// Discover all available theme names from bundled and user theme dirs.
    pub fn list_available() -> Vec<String> {
        let mut names = std::collections::BTreeSet::new();

        let exe_themes = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.join("../themes")));
        if let Some(dir) = exe_themes {
            Self::scan_theme_dir(&dir, &mut names);
        }

        Self::scan_theme_dir(&Self::user_theme_dir(), &mut names);

        for (name, _) in BUNDLED {
            names.insert(name.to_string());
        }

        names.into_iter().collect()
    }

    fn scan_theme_dir(dir: &Path, names: &mut std::collections::BTreeSet<String>) {
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.insert(stem.to_string());
                    }
                }
            }
        }
    }

    fn user_theme_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR)
            .join("themes")
    }

    fn theme_path(name: &str) -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        exe_dir
            .join("..")
            .join("themes")
            .join(format!("{name}.toml"))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ThemeFile =
            toml::from_str(content).with_context(|| "Failed to parse theme TOML")?;
        let c = &file.colors;

        Ok(Self {
            name: file.name,
            text: parse_hex(&c.text)?,
            muted: parse_hex(&c.muted)?,
            added_fg: parse_hex(&c.added_fg)?,
            added_bg: parse_hex(&c.added_bg)?,
            added_border: parse_hex(&c.added_border)?,
            removed_fg: parse_hex(&c.removed_fg)?,
            removed_bg: parse_hex(&c.removed_bg)?,
            highlight_fg: parse_hex(&c.highlight_fg)?,
            highlight_bg: parse_hex(&c.highlight_bg)?,
        })
    }
}

fn parse_hex(hex: &str) -> Result<Rgb> {
    let hex = hex.trim_start_matches('#');
    anyhow::ensure!(
        hex.len() == 6 && hex.is_ascii(),
        "Invalid hex color: #{hex}"
    );

    let r = u8::from_str_radix(&hex[0..2], 16)
        .with_context(|| format!("Invalid red component in #{hex}"))?;
    let g = u8::from_str_radix(&hex[2..4], 16)
        .with_context(|| format!("Invalid green component in #{hex}"))?;
    let b = u8::from_str_radix(&hex[4..6], 16)
        .with_context(|| format!("Invalid blue component in #{hex}"))?;

    Ok(Rgb(r, g, b))
}
