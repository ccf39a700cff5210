//! Text highlights (document highlights, search hits) shown as a named region collection.

use crate::diagnostics::{SQUIGGLY_FLAGS, position};
use serde_json::Value;
use textview_core::{Buffer, Region, RegionStyle, ViewId, Workspace, WorkspaceError};

/// Region key highlights are stored under.
pub const HIGHLIGHT_KEY: &str = "highlight";

/// Convert a `textDocument/documentHighlight` result (`DocumentHighlight[] | null`) into regions.
///
/// Empty ranges and malformed entries are skipped.
pub fn document_highlights_to_regions(buffer: &Buffer, result: &Value) -> Vec<Region> {
    let Some(highlights) = result.as_array() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(highlights.len());
    for highlight in highlights {
        let Some(range) = highlight.get("range") else {
            continue;
        };
        let (Some(start), Some(end)) = (
            range.get("start").and_then(|v| position(buffer, v)),
            range.get("end").and_then(|v| position(buffer, v)),
        ) else {
            continue;
        };
        if start == end {
            continue;
        }
        out.push(Region::new(start.min(end), start.max(end)));
    }
    out
}

/// Replace the highlights shown on `view`.
pub fn highlight_text(
    workspace: &mut Workspace,
    view: ViewId,
    regions: Vec<Region>,
) -> Result<(), WorkspaceError> {
    workspace.add_regions(
        view,
        HIGHLIGHT_KEY,
        regions,
        RegionStyle::new("Comment", SQUIGGLY_FLAGS).with_icon("dot"),
    )
}

/// Remove the highlights shown on `view`.
pub fn clear_highlight(workspace: &mut Workspace, view: ViewId) -> Result<bool, WorkspaceError> {
    workspace.erase_regions(view, HIGHLIGHT_KEY)
}

/// Remove the highlights of every open view.
pub fn clear_all_highlights(workspace: &mut Workspace) -> Result<(), WorkspaceError> {
    for view in workspace.view_ids() {
        clear_highlight(workspace, view)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_document_highlights() {
        let buffer = Buffer::new("let a = a + 1;\n");
        let result = json!([
            { "range": { "start": { "line": 0, "character": 4 }, "end": { "line": 0, "character": 5 } }, "kind": 3 },
            { "range": { "start": { "line": 0, "character": 8 }, "end": { "line": 0, "character": 9 } }, "kind": 2 },
            { "range": { "start": { "line": 0, "character": 2 }, "end": { "line": 0, "character": 2 } } },
            { "kind": 1 }
        ]);
        assert_eq!(
            document_highlights_to_regions(&buffer, &result),
            vec![Region::new(4, 5), Region::new(8, 9)]
        );
        assert!(document_highlights_to_regions(&buffer, &Value::Null).is_empty());
    }
}
