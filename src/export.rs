//! Export artifacts: a clean or redlined document wrapped in an HTML
//! container that word processors open as a `.doc` file.
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};

use crate::diff::Lookahead;
use crate::markup;
use crate::redline::{self, RedlineStyle};

const FALLBACK_TITLE: &str = "Contract";
const TITLE_CHAR_LIMIT: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content: String,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        Ok(path)
    }
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#\s*(.+)$").expect("valid heading regex"))
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\-. ]+").expect("valid filename regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Title of a contract: its first heading, else its first non-blank line.
pub fn document_title(md: &str) -> String {
    for line in md.split('\n') {
        if let Some(caps) = heading_re().captures(line) {
            let title = caps[1].trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    md.split('\n')
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TITLE_CHAR_LIMIT).collect())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// A file-name-safe version of `title`.
pub fn file_name_base(title: &str) -> String {
    let cleaned = unsafe_chars_re().replace_all(title, "");
    let base = whitespace_re().replace_all(cleaned.trim(), "_");
    if base.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        base.into_owned()
    }
}

/// Wrap an HTML fragment in a Word-compatible document.
pub fn wrap_document(title: &str, fragment: &str, style: &RedlineStyle) -> String {
    format!(
        "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
xmlns:w='urn:schemas-microsoft-com:office:word' \
xmlns='http://www.w3.org/TR/REC-html40'>
<head>
<meta charset='utf-8'>
<title>{title}</title>
<style>
body {{ font-family: 'Times New Roman', serif; font-size: 12pt; line-height: 1.5; }}
h1, h2, h3 {{ font-family: 'Arial', sans-serif; color: #000; }}
p {{ margin-bottom: 1em; }}
ul, ol {{ margin-bottom: 1em; }}
del {{ {del} }}
ins {{ {ins} }}
</style>
</head>
<body>
{fragment}
</body>
</html>
",
        title = markup::escape_html(title),
        del = style.deletion_css,
        ins = style.insertion_css,
    )
}

/// The current document rendered without any change marks.
pub fn export_clean(md: &str, style: &RedlineStyle) -> ExportArtifact {
    let title = document_title(md);
    let content = wrap_document(&title, &markup::to_rendered(md), style);
    ExportArtifact {
        file_name: format!("{}_Final.doc", file_name_base(&title)),
        content,
    }
}

/// The document rendered as a redline against `base_md`. The title always
/// comes from the current document.
pub fn export_redline(
    base_md: &str,
    md: &str,
    lookahead: &Lookahead,
    style: &RedlineStyle,
) -> ExportArtifact {
    let title = document_title(md);
    let fragment = redline::compose_document_view_with(base_md, md, lookahead, style);
    ExportArtifact {
        file_name: format!("{}_Redlined.doc", file_name_base(&title)),
        content: wrap_document(&title, &fragment, style),
    }
}
