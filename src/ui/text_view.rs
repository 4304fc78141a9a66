use std::io::{self, Write};

use crate::diff::{ChangeKind, ChangeRecord};

use super::{Painter, Role};

/// Print a text redline, one record per line, with `+`/`-` gutters.
pub fn print_records<W: Write>(
    out: &mut W,
    painter: &Painter<'_>,
    records: &[&ChangeRecord<'_>],
) -> io::Result<()> {
    for record in records {
        let (gutter, role) = match record.kind {
            ChangeKind::Unchanged => ("  ", Role::Text),
            ChangeKind::Added => ("+ ", Role::Added),
            ChangeKind::Removed => ("- ", Role::Removed),
        };
        painter.paint(out, Role::Muted, gutter)?;
        painter.paint(out, role, record.value)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Print a one-line summary of the change counts.
pub fn print_summary<W: Write>(
    out: &mut W,
    painter: &Painter<'_>,
    added: usize,
    removed: usize,
) -> io::Result<()> {
    if added == 0 && removed == 0 {
        painter.paint(out, Role::Muted, "no changes")?;
    } else {
        painter.paint(out, Role::Added, format!("+{added}"))?;
        write!(out, " ")?;
        painter.paint(out, Role::Removed, format!("-{removed}"))?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;
    use crate::theme::Theme;

    #[test]
    fn test_print_records_plain() {
        let theme = Theme::default_theme();
        let painter = Painter::new(&theme, false);
        let records = diff::align("a\nb", "a\nc");
        let refs: Vec<_> = records.iter().collect();

        let mut out = Vec::new();
        print_records(&mut out, &painter, &refs).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "  a\n- b\n+ c\n");
    }

    #[test]
    fn test_summary() {
        let theme = Theme::default_theme();
        let painter = Painter::new(&theme, false);

        let mut out = Vec::new();
        print_summary(&mut out, &painter, 2, 1).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "+2 -1\n");

        let mut out = Vec::new();
        print_summary(&mut out, &painter, 0, 0).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no changes\n");
    }
}
