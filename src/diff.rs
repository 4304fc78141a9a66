//! Line- and block-level alignment using bounded lookahead.
//! Produces a list of ChangeRecord values that reconstruct both inputs and
//! can be rendered as a text redline or fed to the document composer.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How many lines ahead either side is searched for a resync point.
pub const LINE_LOOKAHEAD: usize = 10;

/// How many blocks ahead either side is searched in block mode.
pub const BLOCK_LOOKAHEAD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeRecord<'a> {
    pub kind: ChangeKind,
    pub value: &'a str,
}

impl<'a> ChangeRecord<'a> {
    pub fn unchanged(value: &'a str) -> Self {
        Self {
            kind: ChangeKind::Unchanged,
            value,
        }
    }

    pub fn added(value: &'a str) -> Self {
        Self {
            kind: ChangeKind::Added,
            value,
        }
    }

    pub fn removed(value: &'a str) -> Self {
        Self {
            kind: ChangeKind::Removed,
            value,
        }
    }

    pub fn is_change(&self) -> bool {
        self.kind != ChangeKind::Unchanged
    }
}

/// Lookahead windows for both alignment granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Lookahead {
    #[serde(rename = "line_lookahead")]
    pub lines: usize,
    #[serde(rename = "block_lookahead")]
    pub blocks: usize,
}

impl Default for Lookahead {
    fn default() -> Self {
        Self {
            lines: LINE_LOOKAHEAD,
            blocks: BLOCK_LOOKAHEAD,
        }
    }
}

/// Which input a reconstruction should reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

/// Split a document into lines. The empty document has no lines; anything
/// else splits on `\n` without trimming, so a trailing newline yields a
/// trailing empty line.
pub fn split_lines(doc: &str) -> Vec<&str> {
    if doc.is_empty() {
        Vec::new()
    } else {
        doc.split('\n').collect()
    }
}

/// Align `old` against `new` line by line with the default window.
pub fn align<'a>(old: &'a str, new: &'a str) -> Vec<ChangeRecord<'a>> {
    align_lines(old, new, LINE_LOOKAHEAD)
}

/// Align two documents line by line. Lines compare byte-for-byte.
pub fn align_lines<'a>(old: &'a str, new: &'a str, window: usize) -> Vec<ChangeRecord<'a>> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let records = align_keyed(&old_lines, &new_lines, &old_lines, &new_lines, window);
    tracing::debug!(
        old_lines = old_lines.len(),
        new_lines = new_lines.len(),
        window,
        stats = ?ChangeStats::from_records(&records),
        "aligned lines"
    );
    records
}

/// Align two block sequences. Blocks compare after whitespace collapsing,
/// and unchanged records carry the old block.
pub fn align_blocks<'a>(
    old: &[&'a str],
    new: &[&'a str],
    window: usize,
) -> Vec<ChangeRecord<'a>> {
    let old_keys: Vec<String> = old.iter().map(|b| collapse_whitespace(b)).collect();
    let new_keys: Vec<String> = new.iter().map(|b| collapse_whitespace(b)).collect();
    let records = align_keyed(old, new, &old_keys, &new_keys, window);
    tracing::debug!(
        old_blocks = old.len(),
        new_blocks = new.len(),
        window,
        stats = ?ChangeStats::from_records(&records),
        "aligned blocks"
    );
    records
}

/// Align two rendered fragments at block granularity. Takes the output of
/// [`split_rendered_blocks`], which owns its newline-free pieces.
pub fn align_rendered<'a>(
    old: &'a [String],
    new: &'a [String],
    window: usize,
) -> Vec<ChangeRecord<'a>> {
    let old_blocks: Vec<&str> = old.iter().map(String::as_str).collect();
    let new_blocks: Vec<&str> = new.iter().map(String::as_str).collect();
    align_blocks(&old_blocks, &new_blocks, window)
}

/// Split a rendered fragment after each block-closing marker
/// (`</p>`, `</h1>`..`</h6>`, `</ul>`, `</ol>`, `<br>`).
/// Newlines are dropped before splitting, so `<p>One\ntwo</p>` becomes
/// `<p>Onetwo</p>`; pieces are trimmed and empty ones dropped.
pub fn split_rendered_blocks(html: &str) -> Vec<String> {
    static BLOCK_END: OnceLock<Regex> = OnceLock::new();
    let block_end = BLOCK_END.get_or_init(|| {
        Regex::new(r"(?i)</p>|</h[1-6]>|</ul>|</ol>|<br\s*/?>").expect("valid block regex")
    });

    let flat = html.replace('\n', "");
    let mut blocks = Vec::new();
    let mut start = 0;
    for m in block_end.find_iter(&flat) {
        push_block(&mut blocks, &flat[start..m.end()]);
        start = m.end();
    }
    push_block(&mut blocks, &flat[start..]);
    blocks
}

fn push_block(blocks: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        blocks.push(piece.to_string());
    }
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The alignment walk shared by both granularities. `old_keys`/`new_keys`
/// are what gets compared; `old`/`new` are what records carry.
fn align_keyed<'a, K: PartialEq>(
    old: &[&'a str],
    new: &[&'a str],
    old_keys: &[K],
    new_keys: &[K],
    window: usize,
) -> Vec<ChangeRecord<'a>> {
    let mut records = Vec::with_capacity(old.len().max(new.len()));
    let mut i = 0;
    let mut j = 0;

    while i < old.len() && j < new.len() {
        if old_keys[i] == new_keys[j] {
            records.push(ChangeRecord::unchanged(old[i]));
            i += 1;
            j += 1;
            continue;
        }

        // Additions win ties: try to explain new[j..k] as inserted first.
        if let Some(k) = find_ahead(new_keys, j, window, &old_keys[i]) {
            records.extend(new[j..k].iter().map(|v| ChangeRecord::added(v)));
            j = k;
        } else if let Some(k) = find_ahead(old_keys, i, window, &new_keys[j]) {
            records.extend(old[i..k].iter().map(|v| ChangeRecord::removed(v)));
            i = k;
        } else {
            records.push(ChangeRecord::removed(old[i]));
            records.push(ChangeRecord::added(new[j]));
            i += 1;
            j += 1;
        }
    }

    records.extend(old[i..].iter().map(|v| ChangeRecord::removed(v)));
    records.extend(new[j..].iter().map(|v| ChangeRecord::added(v)));
    records
}

/// Index of the first key equal to `target` in `keys[from+1 ..= from+window]`.
fn find_ahead<K: PartialEq>(keys: &[K], from: usize, window: usize, target: &K) -> Option<usize> {
    keys.iter()
        .enumerate()
        .skip(from + 1)
        .take(window)
        .find(|(_, key)| *key == target)
        .map(|(idx, _)| idx)
}

/// Rebuild one side of the alignment by joining the records that belong to it.
pub fn reconstruct(records: &[ChangeRecord<'_>], side: Side) -> String {
    let skip = match side {
        Side::Old => ChangeKind::Added,
        Side::New => ChangeKind::Removed,
    };
    records
        .iter()
        .filter(|r| r.kind != skip)
        .map(|r| r.value)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-kind record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeStats {
    pub unchanged: usize,
    pub added: usize,
    pub removed: usize,
}

impl ChangeStats {
    pub fn from_records(records: &[ChangeRecord<'_>]) -> Self {
        let mut stats = Self::default();
        for record in records {
            match record.kind {
                ChangeKind::Unchanged => stats.unchanged += 1,
                ChangeKind::Added => stats.added += 1,
                ChangeKind::Removed => stats.removed += 1,
            }
        }
        stats
    }

    pub fn is_identical(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Format records as a unified-style string with +/- prefixes.
pub fn format_unified(records: &[ChangeRecord<'_>]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(match record.kind {
            ChangeKind::Unchanged => "  ",
            ChangeKind::Removed => "- ",
            ChangeKind::Added => "+ ",
        });
        out.push_str(record.value);
        out.push('\n');
    }
    out
}

/// Return the changed records plus `context` unchanged records around each one.
pub fn with_context<'r, 'a>(
    records: &'r [ChangeRecord<'a>],
    context: usize,
) -> Vec<&'r ChangeRecord<'a>> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut visible = vec![false; records.len()];

    for (i, record) in records.iter().enumerate() {
        if record.is_change() {
            let start = i.saturating_sub(context);
            let end = (i + context + 1).min(records.len());
            for v in &mut visible[start..end] {
                *v = true;
            }
        }
    }

    records
        .iter()
        .enumerate()
        .filter(|(i, _)| visible[*i])
        .map(|(_, record)| record)
        .collect()
}
