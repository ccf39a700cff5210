//! Per-session change records.
//!
//! [`Buffer::end_edit`](crate::Buffer::end_edit) returns a [`TextDelta`] holding every mutation of
//! the closed session, in application order. A consumer holding the old text can replay it with
//! [`TextDelta::apply_to`] instead of diffing.

/// One mutation of a session.
///
/// `start` is a character offset into the text as it was right before this mutation ran,
/// so later entries already account for earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Character offset the mutation starts at.
    pub start: usize,
    /// Removed text, empty for a pure insert.
    pub deleted_text: String,
    /// Added text, empty for a pure erase.
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Removed length in chars.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Added length in chars.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// End of the removed span, exclusive.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }
}

/// Everything one session committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Length in chars when the session opened.
    pub before_char_count: usize,
    /// Length in chars after the commit.
    pub after_char_count: usize,
    /// Mutations in the order they ran.
    pub edits: Vec<TextDeltaEdit>,
    /// Version after the commit; unchanged when `edits` is empty.
    pub version: u64,
}

impl TextDelta {
    /// `true` when the session committed nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Signed change in length.
    pub fn net_change(&self) -> isize {
        self.after_char_count as isize - self.before_char_count as isize
    }

    /// Replay the mutations on a copy of the pre-session text.
    ///
    /// Returns `None` if `before` does not match: wrong length, or a removed span that differs
    /// from the recorded text.
    pub fn apply_to(&self, before: &str) -> Option<String> {
        if before.chars().count() != self.before_char_count {
            return None;
        }
        let mut chars: Vec<char> = before.chars().collect();
        for edit in &self.edits {
            let end = edit.end();
            if end > chars.len() {
                return None;
            }
            if !chars[edit.start..end].iter().copied().eq(edit.deleted_text.chars()) {
                return None;
            }
            chars.splice(edit.start..end, edit.inserted_text.chars());
        }
        Some(chars.into_iter().collect())
    }
}
