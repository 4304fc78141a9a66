//! Redline engine for markdown contracts.
//!
//! Aligns two versions of a document with a bounded-lookahead diff, renders
//! the result as a text or tracked-change redline, locates analysis excerpts,
//! and keeps a linear edit history for the editing session.
pub mod config;
pub mod diff;
pub mod export;
pub mod highlight;
pub mod history;
pub mod markup;
pub mod redline;
pub mod session;
pub mod theme;
pub mod ui;

pub use diff::{align, ChangeKind, ChangeRecord, Lookahead};
pub use highlight::{apply_highlights, HighlightSpan};
pub use history::EditHistory;
pub use markup::{to_markup, to_rendered};
pub use redline::{compose_document_view, compose_text_view, DiffSource, RedlineStyle};
pub use session::{AiIntent, AiOutcome, AiResult, Session, SessionSettings};
