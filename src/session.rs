use serde::Deserialize;

use crate::config::Config;
use crate::diff::{self, ChangeRecord, Lookahead};
use crate::export::{self, ExportArtifact};
use crate::highlight::{self, HighlightSpan, EXCERPT_CHAR_LIMIT};
use crate::history::{EditHistory, MAX_ENTRIES};
use crate::markup;
use crate::redline::{self, DiffSource, RedlineStyle};
use crate::theme::Theme;

/// What the analysis backend meant its answer to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AiIntent {
    Modification,
    Analysis,
}

/// A result handed over by the AI request collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct AiResult {
    pub intent: AiIntent,
    pub content: String,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiOutcome {
    /// The document was blank, so the content became the document directly.
    Applied,
    /// The content is now a live proposal awaiting accept/reject.
    Proposed,
    /// The content matches the current document up to whitespace.
    NoChange,
    /// Analysis answer; highlights (if any) were installed.
    Analysis,
}

/// Tunables for a session, resolved once from config and theme.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub lookahead: Lookahead,
    pub style: RedlineStyle,
    pub excerpt_limit: usize,
    pub history_limit: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lookahead: Lookahead::default(),
            style: RedlineStyle::default(),
            excerpt_limit: EXCERPT_CHAR_LIMIT,
            history_limit: MAX_ENTRIES,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config, theme: &Theme) -> Self {
        Self {
            lookahead: config.diff,
            style: RedlineStyle::from_theme(theme),
            excerpt_limit: config.highlight.excerpt_limit,
            history_limit: config.history.max_entries,
        }
    }
}

/// The editing session: the authoritative document plus the auxiliary
/// documents diffs are taken against.
#[derive(Debug)]
pub struct Session {
    settings: SessionSettings,
    current: String,
    /// Last state accepted as clean.
    baseline: Option<String>,
    /// State when the document was created, imported or compared.
    initial_baseline: Option<String>,
    /// Original of an external two-document comparison.
    comparison: Option<String>,
    proposal: Option<String>,
    diff_mode: bool,
    highlights: Vec<String>,
    history: EditHistory,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        let history = EditHistory::with_limit("", settings.history_limit);
        Self {
            settings,
            current: String::new(),
            baseline: None,
            initial_baseline: None,
            comparison: None,
            proposal: None,
            diff_mode: false,
            highlights: Vec::new(),
            history,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn proposal(&self) -> Option<&str> {
        self.proposal.as_deref()
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    pub fn is_diff_mode(&self) -> bool {
        self.diff_mode
    }

    pub fn highlights(&self) -> &[String] {
        &self.highlights
    }

    /// Start from an empty document.
    pub fn new_document(&mut self) {
        self.load(String::new());
        tracing::debug!("new document");
    }

    /// Replace the session with an imported document.
    pub fn import(&mut self, content: impl Into<String>) {
        self.load(content.into());
        tracing::debug!(len = self.current.len(), "imported document");
    }

    /// Enter comparison of two external documents; `revised` becomes current.
    pub fn compare(&mut self, original: impl Into<String>, revised: impl Into<String>) {
        self.load(revised.into());
        self.comparison = Some(original.into());
        self.diff_mode = true;
        tracing::debug!("comparing external documents");
    }

    fn load(&mut self, content: String) {
        self.baseline = Some(content.clone());
        self.initial_baseline = Some(content.clone());
        self.history.reset(content.clone());
        self.current = content;
        self.comparison = None;
        self.proposal = None;
        self.diff_mode = false;
        self.highlights.clear();
    }

    /// Feed an AI result into the session.
    pub fn apply_ai_result(&mut self, result: AiResult) -> AiOutcome {
        match result.intent {
            AiIntent::Analysis => {
                if let Some(highlights) = result.highlights.filter(|h| !h.is_empty()) {
                    tracing::debug!(count = highlights.len(), "installing highlights");
                    self.highlights = highlights;
                }
                AiOutcome::Analysis
            }
            AiIntent::Modification => {
                self.highlights.clear();
                let current = diff::collapse_whitespace(&self.current);
                let proposed = diff::collapse_whitespace(&result.content);

                if current.is_empty() {
                    self.baseline = Some(result.content.clone());
                    self.initial_baseline = Some(result.content.clone());
                    self.history.push(result.content.clone());
                    self.current = result.content;
                    self.proposal = None;
                    self.diff_mode = false;
                    tracing::debug!("blank document, applied content directly");
                    AiOutcome::Applied
                } else if current != proposed {
                    self.proposal = Some(result.content);
                    self.diff_mode = true;
                    tracing::debug!("proposal staged for review");
                    AiOutcome::Proposed
                } else {
                    tracing::debug!("proposal matches current document");
                    AiOutcome::NoChange
                }
            }
        }
    }

    /// Accept the live proposal. No-op without one.
    pub fn accept(&mut self) -> bool {
        let Some(proposal) = self.proposal.take() else {
            return false;
        };
        self.baseline = Some(proposal.clone());
        self.history.push(proposal.clone());
        self.current = proposal;
        self.diff_mode = false;
        tracing::debug!("proposal accepted");
        true
    }

    /// Discard the live proposal and leave the diff view.
    pub fn reject(&mut self) -> bool {
        let had_proposal = self.proposal.take().is_some();
        self.diff_mode = false;
        tracing::debug!(had_proposal, "proposal rejected");
        had_proposal
    }

    /// A direct edit of the markup by the user.
    pub fn user_edit(&mut self, doc: impl Into<String>) {
        self.current = doc.into();
        self.highlights.clear();
        self.history.push(self.current.clone());
    }

    /// A direct edit made in the rendered view; redline markup is dropped.
    pub fn rendered_edit(&mut self, html: &str) {
        self.user_edit(markup::to_markup(html));
    }

    pub fn can_undo(&self) -> bool {
        !self.diff_mode && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.diff_mode && self.history.can_redo()
    }

    pub fn undo(&mut self) -> Option<&str> {
        if self.diff_mode {
            return None;
        }
        let snapshot = self.history.undo()?.to_string();
        Some(self.replay(snapshot))
    }

    pub fn redo(&mut self) -> Option<&str> {
        if self.diff_mode {
            return None;
        }
        let snapshot = self.history.redo()?.to_string();
        Some(self.replay(snapshot))
    }

    fn replay(&mut self, snapshot: String) -> &str {
        self.current = snapshot;
        self.highlights.clear();
        &self.current
    }

    /// The diff base active right now, if any. An empty comparison original
    /// or baseline counts as absent.
    pub fn diff_source(&self) -> Option<DiffSource<'_>> {
        let comparison = self
            .comparison
            .as_deref()
            .filter(|original| self.diff_mode && !original.is_empty());
        let drift = self
            .baseline
            .as_deref()
            .filter(|baseline| !baseline.is_empty() && *baseline != self.current);
        DiffSource::select(self.proposal.as_deref(), comparison, drift)
    }

    pub fn text_view(&self) -> Option<Vec<ChangeRecord<'_>>> {
        let source = self.diff_source()?;
        tracing::debug!(source = source.label(), "composing text view");
        let (old, new) = source.bases(&self.current);
        Some(redline::compose_text_view_with(
            old,
            new,
            &self.settings.lookahead,
        ))
    }

    /// The rendered view: a redline when a diff source is active, otherwise
    /// the clean rendering of the current document.
    pub fn document_view(&self) -> String {
        match self.diff_source() {
            Some(source) => {
                let (old, new) = source.bases(&self.current);
                redline::compose_document_view_with(
                    old,
                    new,
                    &self.settings.lookahead,
                    &self.settings.style,
                )
            }
            None => markup::to_rendered(&self.current),
        }
    }

    pub fn highlight_spans(&self) -> Vec<HighlightSpan> {
        highlight::apply_highlights_with_limit(
            &self.current,
            &self.highlights,
            self.settings.excerpt_limit,
        )
    }

    pub fn export_clean(&self) -> ExportArtifact {
        export::export_clean(&self.current, &self.settings.style)
    }

    /// Redlined export against the initial baseline, else the comparison
    /// original, else the document itself. Empty bases are skipped.
    pub fn export_redline(&self) -> ExportArtifact {
        let base = self
            .initial_baseline
            .as_deref()
            .filter(|base| !base.is_empty())
            .or(self.comparison.as_deref().filter(|base| !base.is_empty()))
            .unwrap_or(&self.current);
        export::export_redline(
            base,
            &self.current,
            &self.settings.lookahead,
            &self.settings.style,
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modification(content: &str) -> AiResult {
        AiResult {
            intent: AiIntent::Modification,
            content: content.to_string(),
            highlights: None,
        }
    }

    #[test]
    fn test_fresh_session_has_no_source() {
        let session = Session::default();
        assert_eq!(session.current(), "");
        assert!(session.diff_source().is_none());
        assert!(session.text_view().is_none());
        assert_eq!(session.document_view(), "");
    }

    #[test]
    fn test_modification_on_blank_applies_directly() {
        let mut session = Session::default();
        session.new_document();
        let outcome = session.apply_ai_result(modification("# Draft\n\nBody"));
        assert_eq!(outcome, AiOutcome::Applied);
        assert_eq!(session.current(), "# Draft\n\nBody");
        assert!(session.proposal().is_none());
        assert!(session.diff_source().is_none());
    }

    #[test]
    fn test_whitespace_only_modification_is_no_change() {
        let mut session = Session::default();
        session.import("Clause one.\nClause two.");
        let outcome = session.apply_ai_result(modification("Clause one.  Clause two.\n"));
        assert_eq!(outcome, AiOutcome::NoChange);
        assert!(!session.is_diff_mode());
    }

    #[test]
    fn test_accept_without_proposal_is_noop() {
        let mut session = Session::default();
        session.import("A");
        assert!(!session.accept());
        assert_eq!(session.current(), "A");
    }

    #[test]
    fn test_analysis_sets_highlights_and_edit_clears_them() {
        let mut session = Session::default();
        session.import("Term is 12 months.");
        let outcome = session.apply_ai_result(AiResult {
            intent: AiIntent::Analysis,
            content: "The term is short.".to_string(),
            highlights: Some(vec!["12 months".to_string()]),
        });
        assert_eq!(outcome, AiOutcome::Analysis);
        assert_eq!(session.highlights(), ["12 months".to_string()]);
        assert!(session.highlight_spans().iter().any(|s| s.is_highlight));

        session.user_edit("Term is 24 months.");
        assert!(session.highlights().is_empty());
    }

    #[test]
    fn test_ai_result_from_json() {
        let json = r#"{"intent":"ANALYSIS","content":"ok","highlights":["a","b"]}"#;
        let result: AiResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.intent, AiIntent::Analysis);
        assert_eq!(result.highlights.unwrap().len(), 2);

        let json = r#"{"intent":"MODIFICATION","content":"new"}"#;
        let result: AiResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.intent, AiIntent::Modification);
        assert!(result.highlights.is_none());
    }
}
