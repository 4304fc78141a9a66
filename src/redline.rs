use crate::diff::{self, ChangeKind, ChangeRecord, Lookahead};
use crate::markup;
use crate::theme::Theme;

/// Inline CSS carried by the insertion and deletion markers so the fragment
/// renders correctly outside the host UI (exported documents included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedlineStyle {
    pub insertion_css: String,
    pub deletion_css: String,
}

impl Default for RedlineStyle {
    fn default() -> Self {
        Self {
            insertion_css: "background-color:#cce5ff;color:#004085;border-left:3px solid #3399ff;padding:2px;display:block;text-decoration:none;".to_string(),
            deletion_css: "color:#d00000;text-decoration:line-through;".to_string(),
        }
    }
}

impl RedlineStyle {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            insertion_css: format!(
                "background-color:{};color:{};border-left:3px solid {};padding:2px;display:block;text-decoration:none;",
                theme.added_bg.css(),
                theme.added_fg.css(),
                theme.added_border.css()
            ),
            deletion_css: format!(
                "color:{};text-decoration:line-through;",
                theme.removed_fg.css()
            ),
        }
    }
}

/// Which pair of documents a redline compares. Exactly one is active at a
/// time; see [`DiffSource::select`] for the precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSource<'a> {
    /// A live AI proposal, compared against the current document.
    Proposal(&'a str),
    /// An externally supplied original; the current document is the revision.
    Comparison(&'a str),
    /// The last accepted baseline; shows drift since then.
    BaselineDrift(&'a str),
}

impl<'a> DiffSource<'a> {
    /// Pick the active source: live proposal, then external comparison, then
    /// baseline drift.
    pub fn select(
        proposal: Option<&'a str>,
        comparison: Option<&'a str>,
        baseline: Option<&'a str>,
    ) -> Option<Self> {
        proposal
            .map(DiffSource::Proposal)
            .or_else(|| comparison.map(DiffSource::Comparison))
            .or_else(|| baseline.map(DiffSource::BaselineDrift))
    }

    /// The `(old, new)` pair to align, given the current document.
    pub fn bases(&self, current: &'a str) -> (&'a str, &'a str) {
        match *self {
            DiffSource::Proposal(proposed) => (current, proposed),
            DiffSource::Comparison(original) => (original, current),
            DiffSource::BaselineDrift(baseline) => (baseline, current),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiffSource::Proposal(_) => "proposal",
            DiffSource::Comparison(_) => "comparison",
            DiffSource::BaselineDrift(_) => "baseline",
        }
    }
}

/// The text redline: one record per line.
pub fn compose_text_view<'a>(old: &'a str, new: &'a str) -> Vec<ChangeRecord<'a>> {
    diff::align(old, new)
}

pub fn compose_text_view_with<'a>(
    old: &'a str,
    new: &'a str,
    lookahead: &Lookahead,
) -> Vec<ChangeRecord<'a>> {
    diff::align_lines(old, new, lookahead.lines)
}

/// The rendered redline: one fragment with `<ins>`/`<del>` markup.
pub fn compose_document_view(old: &str, new: &str) -> String {
    compose_document_view_with(old, new, &Lookahead::default(), &RedlineStyle::default())
}

/// Align both documents block by block and render the result.
///
/// Unchanged blocks render as-is, added blocks render inside an insertion
/// marker, both against the new document's reference definitions. Removed
/// blocks are shown as their escaped raw markup inside a deletion marker:
/// re-rendering removed structure (a deleted heading, say) would leak it
/// into the document outline.
pub fn compose_document_view_with(
    old: &str,
    new: &str,
    lookahead: &Lookahead,
    style: &RedlineStyle,
) -> String {
    let old_blocks = markup::split_blocks(old);
    let new_blocks = markup::split_blocks(new);
    let definitions = markup::reference_definitions(new);
    let records = diff::align_blocks(&old_blocks, &new_blocks, lookahead.blocks);

    let mut out = String::new();
    for record in &records {
        match record.kind {
            ChangeKind::Unchanged => {
                out.push_str(&markup::render_block(record.value, &definitions))
            }
            ChangeKind::Added => {
                out.push_str(&format!(
                    "<ins class=\"redline-ins\" style='{}'>{}</ins>",
                    style.insertion_css,
                    markup::render_block(record.value, &definitions)
                ));
            }
            ChangeKind::Removed => {
                out.push_str(&format!(
                    "<del class=\"redline-del\" style='{}'>{}</del><br/>",
                    style.deletion_css,
                    markup::escape_html(record.value).replace('\n', "<br/>")
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Rgb;

    #[test]
    fn test_select_precedence() {
        assert_eq!(
            DiffSource::select(Some("p"), Some("c"), Some("b")),
            Some(DiffSource::Proposal("p"))
        );
        assert_eq!(
            DiffSource::select(None, Some("c"), Some("b")),
            Some(DiffSource::Comparison("c"))
        );
        assert_eq!(
            DiffSource::select(None, None, Some("b")),
            Some(DiffSource::BaselineDrift("b"))
        );
        assert_eq!(DiffSource::select(None, None, None), None);
    }

    #[test]
    fn test_bases() {
        assert_eq!(DiffSource::Proposal("p").bases("cur"), ("cur", "p"));
        assert_eq!(DiffSource::Comparison("o").bases("cur"), ("o", "cur"));
        assert_eq!(DiffSource::BaselineDrift("b").bases("cur"), ("b", "cur"));
    }

    #[test]
    fn test_text_view_delegates_to_aligner() {
        let records = compose_text_view("a\nb", "a\nc");
        assert_eq!(records, diff::align("a\nb", "a\nc"));
    }

    #[test]
    fn test_document_view_unchanged_is_plain_render() {
        let doc = "# Title\n\nBody text";
        let html = compose_document_view(doc, doc);
        assert_eq!(html, "<h1>Title</h1>\n<p>Body text</p>\n");
        assert!(!html.contains("<ins") && !html.contains("<del"));
    }

    #[test]
    fn test_document_view_marks_changes() {
        let old = "# Title\n\nAlpha\n\nBeta";
        let new = "# Title\n\nAlpha changed\n\nBeta\n\nGamma";
        let html = compose_document_view(old, new);

        assert!(html.starts_with("<h1>Title</h1>\n"));
        assert!(html.contains("'>Alpha</del><br/>"));
        assert!(html.contains("'><p>Alpha changed</p>\n</ins>"));
        assert!(html.contains("<p>Beta</p>\n"));
        assert!(html.contains("'><p>Gamma</p>\n</ins>"));
        assert_eq!(html.matches("<ins").count(), 2);
        assert_eq!(html.matches("<del").count(), 1);
    }

    #[test]
    fn test_removed_heading_stays_raw_text() {
        let html = compose_document_view("## Old Heading\n\nBody", "Body");
        assert!(html.contains("## Old Heading</del>"));
        assert!(!html.contains("<h2>"));
    }

    #[test]
    fn test_removed_block_is_escaped() {
        let html = compose_document_view("Keep\n\nA <b>tag</b> & more", "Keep");
        assert!(html.contains("A &lt;b&gt;tag&lt;/b&gt; &amp; more</del>"));
    }

    #[test]
    fn test_removed_multiline_block_uses_breaks() {
        let html = compose_document_view("- one\n- two", "");
        assert!(html.contains("- one<br/>- two</del><br/>"));
    }

    #[test]
    fn test_whitespace_only_block_change_is_unchanged() {
        let html = compose_document_view("Some   spaced\ntext", "Some spaced text");
        assert!(!html.contains("<ins") && !html.contains("<del"));
    }

    #[test]
    fn test_strip_recovers_new_content() {
        let old = "# Title\n\nAlpha\n\nBeta";
        let new = "# Title\n\nAlpha changed\n\nBeta\n\nGamma";
        let html = compose_document_view(old, new);
        assert_eq!(markup::to_markup(&html), new);
    }

    #[test]
    fn test_reference_links_resolve_and_definitions_survive() {
        let old = "# T\n\nSee [the terms][t].\n\nOld clause.\n\n[t]: https://x.test/terms";
        let new = "# T\n\nSee [the terms][t].\n\nNew clause.\n\n[t]: https://x.test/terms";
        let html = compose_document_view(old, new);

        assert!(html.contains("<p>See <a href=\"https://x.test/terms\">the terms</a>.</p>"));
        assert!(html.contains("<p>[t]: https://x.test/terms</p>"));
        assert_eq!(
            markup::to_markup(&html),
            "# T\n\nSee [the terms](https://x.test/terms).\n\nNew clause.\n\n[t]: https://x.test/terms"
        );
    }

    #[test]
    fn test_changed_definition_is_redlined() {
        let html = compose_document_view(
            "Para.\n\n[t]: https://a.test",
            "Para.\n\n[t]: https://b.test",
        );
        assert!(html.contains("[t]: https://a.test</del><br/>"));
        assert!(html.contains("'><p>[t]: https://b.test</p>\n</ins>"));
    }

    #[test]
    fn test_style_from_theme() {
        let mut theme = Theme::default_theme();
        theme.added_bg = Rgb(1, 2, 3);
        theme.removed_fg = Rgb(255, 0, 0);
        let style = RedlineStyle::from_theme(&theme);
        assert!(style.insertion_css.contains("background-color:#010203"));
        assert!(style.deletion_css.contains("color:#ff0000"));

        let html = compose_document_view_with("a", "b", &Lookahead::default(), &style);
        assert!(html.contains(&style.insertion_css));
        assert!(html.contains(&style.deletion_css));
    }
}
