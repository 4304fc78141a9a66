//! Linear undo/redo over full-document snapshots.
//!
//! Replaying a snapshot never re-records it: `undo`/`redo` hand the snapshot
//! back and the caller installs it without calling `push`.

/// Default maximum number of snapshots kept.
pub const MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone)]
pub struct EditHistory {
    entries: Vec<String>,
    cursor: usize,
    max_entries: usize,
}

impl EditHistory {
    /// Start a timeline whose only entry is `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_limit(initial, MAX_ENTRIES)
    }

    pub fn with_limit(initial: impl Into<String>, max_entries: usize) -> Self {
        Self {
            entries: vec![initial.into()],
            cursor: 0,
            max_entries: max_entries.max(2),
        }
    }

    /// Record a new document state. Returns false when `doc` equals the
    /// entry under the cursor. Anything after the cursor is discarded.
    pub fn push(&mut self, doc: impl Into<String>) -> bool {
        let doc = doc.into();
        if self.entries[self.cursor] == doc {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(doc);
        // Trim to max
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn undo(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    pub fn redo(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> &str {
        &self.entries[self.cursor]
    }

    /// Total number of snapshots, including those ahead of the cursor.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a timeline holds at least one snapshot, `reset`
    /// included. Present to pair with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Start over from a single snapshot.
    pub fn reset(&mut self, doc: impl Into<String>) {
        self.entries.clear();
        self.entries.push(doc.into());
        self.cursor = 0;
    }
}
