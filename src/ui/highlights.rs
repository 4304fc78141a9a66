use std::io::{self, Write};

use crate::highlight::HighlightSpan;

use super::{Painter, Role};

/// Print the document with highlighted spans. With colour off, highlights
/// are bracketed so they stay visible.
pub fn print_spans<W: Write>(
    out: &mut W,
    painter: &Painter<'_>,
    spans: &[HighlightSpan],
) -> io::Result<()> {
    for span in spans {
        if !span.is_highlight {
            painter.paint(out, Role::Text, &span.text)?;
        } else if painter.color_enabled() {
            painter.paint(out, Role::Highlight, &span.text)?;
        } else {
            write!(out, "[[{}]]", span.text)?;
        }
    }
    if !spans.last().is_some_and(|s| s.text.ends_with('\n')) {
        writeln!(out)?;
    }
    Ok(())
}
