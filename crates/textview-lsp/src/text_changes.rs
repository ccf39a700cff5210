//! Batched `(row, column)` text changes produced by a language server.
//!
//! All positions in a batch refer to the document *before* the batch. Changes must be sorted and
//! must not overlap; they are applied front to back inside one edit session, each shifted by the
//! net length change of the ones before it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use textview_core::{Region, TextDelta, ViewId, Workspace, WorkspaceError};
use thiserror::Error;

/// A replacement of the text between two `(row, column)` positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    /// Start position (zero-based row and character column).
    pub start: (usize, usize),
    /// End position (zero-based row and character column).
    pub end: (usize, usize),
    /// Replacement text.
    #[serde(default)]
    pub text: String,
}

impl TextChange {
    /// Create a change.
    pub fn new(start: (usize, usize), end: (usize, usize), text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Parse a JSON array of changes.
    pub fn list_from_value(value: &Value) -> Result<Vec<TextChange>, ChangeError> {
        Ok(Vec::<TextChange>::deserialize(value)?)
    }
}

/// Errors produced while applying a change batch.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// The payload is not a list of changes.
    #[error("malformed text change payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A change starts before the end of the previous one.
    #[error("text change {index} overlaps or precedes the previous change")]
    Overlapping {
        /// Index of the offending change in the batch.
        index: usize,
    },
    /// The workspace rejected the edit.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// Apply `changes` to the buffer of `view` in one session.
///
/// Returns the committed delta; views of the buffer remap their selections through it.
pub fn apply_text_changes(
    workspace: &mut Workspace,
    view: ViewId,
    changes: &[TextChange],
) -> Result<TextDelta, ChangeError> {
    let buffer_id = workspace.buffer_id_for_view(view)?;
    let buffer = workspace
        .buffer(buffer_id)
        .ok_or(WorkspaceError::BufferNotFound(buffer_id))?;

    let mut resolved = Vec::with_capacity(changes.len());
    let mut previous_end = 0;
    for (index, change) in changes.iter().enumerate() {
        let start = buffer.text_point(change.start.0, change.start.1);
        let end = buffer.text_point(change.end.0, change.end.1);
        if end < start || start < previous_end {
            return Err(ChangeError::Overlapping { index });
        }
        previous_end = end;
        resolved.push((Region::new(start, end), change.text.as_str()));
    }

    let (_, delta) = workspace.run_command(view, |ctx| {
        let mut shift: isize = 0;
        for (region, text) in &resolved {
            let begin = region.begin().saturating_add_signed(shift);
            let target = Region::new(begin, begin + region.size());
            let inserted = ctx.replace(target, text)?;
            shift += inserted as isize - region.size() as isize;
        }
        Ok(())
    })?;

    tracing::debug!(view = ?view, changes = changes.len(), version = delta.version, "applied text changes");
    Ok(delta)
}
