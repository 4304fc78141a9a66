use contract_redline::{AiIntent, AiOutcome, AiResult, DiffSource, Session, SessionSettings};

fn modification(content: &str) -> AiResult {
    AiResult {
        intent: AiIntent::Modification,
        content: content.to_string(),
        highlights: None,
    }
}

const DRAFT: &str = "# Lease\n\nRent is due monthly.";
const REVISED: &str = "# Lease\n\nRent is due quarterly.";

#[test]
fn test_proposal_review_and_accept() {
    let mut session = Session::new(SessionSettings::default());
    session.import(DRAFT);

    assert_eq!(session.apply_ai_result(modification(REVISED)), AiOutcome::Proposed);
    assert!(session.is_diff_mode());
    assert_eq!(session.diff_source(), Some(DiffSource::Proposal(REVISED)));
    assert!(!session.can_undo());

    let html = session.document_view();
    assert!(html.contains("Rent is due monthly.</del>"));
    assert!(html.contains("<p>Rent is due quarterly.</p>\n</ins>"));

    assert!(session.accept());
    assert_eq!(session.current(), REVISED);
    assert_eq!(session.baseline(), Some(REVISED));
    assert!(session.diff_source().is_none());
    assert!(session.can_undo());
}

#[test]
fn test_reject_keeps_current() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.apply_ai_result(modification(REVISED));

    assert!(session.reject());
    assert_eq!(session.current(), DRAFT);
    assert!(session.proposal().is_none());
    assert!(!session.is_diff_mode());
    assert!(!session.reject());
}

#[test]
fn test_undo_after_accept_then_redo() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.apply_ai_result(modification(REVISED));
    session.accept();

    assert_eq!(session.undo(), Some(DRAFT));
    assert_eq!(session.current(), DRAFT);
    assert_eq!(session.undo(), None);
    assert_eq!(session.redo(), Some(REVISED));
    assert_eq!(session.redo(), None);
}

#[test]
fn test_undo_disabled_while_proposal_is_live() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.user_edit(REVISED);
    session.apply_ai_result(modification("# Lease\n\nRent is waived."));

    assert_eq!(session.undo(), None);
    assert_eq!(session.current(), REVISED);
    session.reject();
    assert_eq!(session.undo(), Some(DRAFT));
}

#[test]
fn test_user_edits_show_baseline_drift() {
    let mut session = Session::default();
    session.import(DRAFT);
    assert!(session.diff_source().is_none());

    session.user_edit(REVISED);
    assert_eq!(session.diff_source(), Some(DiffSource::BaselineDrift(DRAFT)));
    let records = session.text_view().unwrap();
    assert!(records.iter().any(|r| r.value == "Rent is due quarterly."));
}

#[test]
fn test_comparison_precedence() {
    let mut session = Session::default();
    session.compare(DRAFT, REVISED);
    assert_eq!(session.current(), REVISED);
    assert_eq!(session.diff_source(), Some(DiffSource::Comparison(DRAFT)));

    session.apply_ai_result(modification("# Lease\n\nRent is waived."));
    assert!(matches!(session.diff_source(), Some(DiffSource::Proposal(_))));

    session.reject();
    assert!(session.diff_source().is_none());
}

#[test]
fn test_rendered_edit_drops_redline_marks() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.apply_ai_result(modification(REVISED));
    let html = session.document_view();
    session.reject();

    session.rendered_edit(&html);
    assert_eq!(session.current(), REVISED);
}

#[test]
fn test_import_resets_history() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.user_edit(REVISED);
    session.import("# Other");
    assert!(!session.can_undo());
    assert!(session.diff_source().is_none());
}

#[test]
fn test_export_redline_uses_initial_baseline() {
    let mut session = Session::default();
    session.import(DRAFT);
    session.apply_ai_result(modification(REVISED));
    session.accept();

    let artifact = session.export_redline();
    assert_eq!(artifact.file_name, "Lease_Redlined.doc");
    assert!(artifact.content.contains("Rent is due monthly.</del>"));

    let clean = session.export_clean();
    assert_eq!(clean.file_name, "Lease_Final.doc");
    assert!(!clean.content.contains("<del"));
}

#[test]
fn test_blank_start_then_edit_has_no_redline() {
    let mut session = Session::default();
    session.new_document();
    session.user_edit("# NDA\n\nTerms.");

    assert!(session.diff_source().is_none());
    assert_eq!(session.document_view(), "<h1>NDA</h1>\n<p>Terms.</p>\n");

    let artifact = session.export_redline();
    assert_eq!(artifact.file_name, "NDA_Redlined.doc");
    assert!(!artifact.content.contains("<ins"));
    assert!(!artifact.content.contains("<del"));
    assert!(session.can_undo());
}

#[test]
fn test_empty_comparison_original_is_ignored() {
    let mut session = Session::default();
    session.compare("", DRAFT);
    assert!(session.is_diff_mode());
    assert!(session.diff_source().is_none());
    assert_eq!(session.document_view(), contract_redline::to_rendered(DRAFT));
}
