//! Locating analysis excerpts in a document.
//!
//! Excerpts come back from analysis as free text that may have lost the
//! document's line wrapping and inline emphasis markers, so matching is
//! tolerant of both. The result is a segmentation of the document, never a
//! modified copy of it.
use regex::Regex;
use serde::Serialize;

/// Excerpts are cut to this many characters before building a pattern.
pub const EXCERPT_CHAR_LIMIT: usize = 500;

/// Inline emphasis markers removed from excerpts before matching.
const EMPHASIS_MARKERS: &[&str] = &["**", "`", "_"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub text: String,
    pub is_highlight: bool,
}

impl HighlightSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_highlight: false,
        }
    }

    fn highlight(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_highlight: true,
        }
    }
}

/// Segment `doc` into highlighted and plain spans for the given excerpts.
pub fn apply_highlights<S: AsRef<str>>(doc: &str, excerpts: &[S]) -> Vec<HighlightSpan> {
    apply_highlights_with_limit(doc, excerpts, EXCERPT_CHAR_LIMIT)
}

/// Like [`apply_highlights`], with an explicit excerpt length cap.
///
/// Concatenating the returned span texts always reproduces `doc`. Excerpts
/// whose pattern fails to build are skipped; later excerpts only split spans
/// that are not already highlighted.
pub fn apply_highlights_with_limit<S: AsRef<str>>(
    doc: &str,
    excerpts: &[S],
    limit: usize,
) -> Vec<HighlightSpan> {
    let mut spans = vec![HighlightSpan::plain(doc)];

    for excerpt in excerpts {
        let Some(pattern) = excerpt_pattern(excerpt.as_ref(), limit) else {
            continue;
        };
        let regex = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!(error = %e, "skipping excerpt with unusable pattern");
                continue;
            }
        };

        spans = spans
            .into_iter()
            .flat_map(|span| {
                if span.is_highlight {
                    vec![span]
                } else {
                    split_on_matches(&span.text, &regex)
                }
            })
            .collect();
    }

    spans
}

/// Build the matching pattern for one excerpt, or `None` if nothing is left
/// to match once it is trimmed, capped and stripped of emphasis markers.
pub fn excerpt_pattern(excerpt: &str, limit: usize) -> Option<String> {
    let trimmed = excerpt.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut capped: String = trimmed.chars().take(limit).collect();
    for marker in EMPHASIS_MARKERS {
        capped = capped.replace(marker, "");
    }
    if capped.trim().is_empty() {
        return None;
    }

    let escaped = regex::escape(&capped);
    let mut pattern = String::with_capacity(escaped.len());
    let mut in_space = false;
    for c in escaped.chars() {
        if c.is_whitespace() {
            if !in_space {
                pattern.push_str(r"\s+");
            }
            in_space = true;
        } else {
            pattern.push(c);
            in_space = false;
        }
    }
    Some(pattern)
}

fn split_on_matches(text: &str, regex: &Regex) -> Vec<HighlightSpan> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for m in regex.find_iter(text) {
        if m.start() == m.end() {
            continue;
        }
        if m.start() > last {
            pieces.push(HighlightSpan::plain(&text[last..m.start()]));
        }
        pieces.push(HighlightSpan::highlight(m.as_str()));
        last = m.end();
    }

    if pieces.is_empty() {
        return vec![HighlightSpan::plain(text)];
    }
    if last < text.len() {
        pieces.push(HighlightSpan::plain(&text[last..]));
    }
    pieces
}
