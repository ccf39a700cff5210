//! Diagnostics reported by a language server, shown as a named region collection.

use serde_json::Value;
use std::fmt;
use textview_core::{Buffer, Region, RegionFlags, RegionStyle, ViewId, Workspace, WorkspaceError};

/// Region key diagnostics are stored under.
pub const DIAGNOSTICS_KEY: &str = "diagnostics";

/// Flags used to draw diagnostics and highlights: an underline without fill or outline.
pub const SQUIGGLY_FLAGS: RegionFlags = RegionFlags::from_bits(
    RegionFlags::DRAW_NO_FILL.bits()
        | RegionFlags::DRAW_NO_OUTLINE.bits()
        | RegionFlags::DRAW_SQUIGGLY_UNDERLINE.bits(),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Severity of a diagnostic.
pub enum DiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

impl DiagnosticSeverity {
    /// Convert the numeric LSP `DiagnosticSeverity` into an enum.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A diagnostic resolved against a buffer.
pub struct DiagnosticItem {
    /// Severity; unknown values are reported as warnings.
    pub severity: DiagnosticSeverity,
    /// Span in character offsets.
    pub region: Region,
    /// Message, with the reporting source appended in parentheses when present.
    pub message: String,
}

impl DiagnosticItem {
    /// Parse an LSP `Diagnostic` value, resolving its range against `buffer`.
    pub fn from_value(buffer: &Buffer, value: &Value) -> Option<Self> {
        let range = value.get("range")?;
        let start = position(buffer, range.get("start")?)?;
        let end = position(buffer, range.get("end")?)?;
        let severity = value
            .get("severity")
            .and_then(Value::as_u64)
            .and_then(DiagnosticSeverity::from_u64)
            .unwrap_or(DiagnosticSeverity::Warning);

        let mut message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if let Some(source) = value.get("source").and_then(Value::as_str) {
            message = format!("{message} ({source})");
        }

        Some(Self {
            severity,
            region: Region::new(start, end),
            message,
        })
    }
}

pub(crate) fn position(buffer: &Buffer, value: &Value) -> Option<usize> {
    let line = value.get("line")?.as_u64()? as usize;
    let character = value.get("character")?.as_u64()? as usize;
    Some(buffer.text_point(line, character))
}

/// Error and non-error counts of a diagnostic batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    /// Diagnostics with [`DiagnosticSeverity::Error`].
    pub errors: usize,
    /// All other diagnostics.
    pub warnings: usize,
}

impl DiagnosticSummary {
    /// Count the items of a batch.
    pub fn from_items(items: &[DiagnosticItem]) -> Self {
        let errors = items
            .iter()
            .filter(|item| item.severity == DiagnosticSeverity::Error)
            .count();
        Self {
            errors,
            warnings: items.len() - errors,
        }
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR {}, WARNING {}", self.errors, self.warnings)
    }
}

/// Parse a `publishDiagnostics` list for the buffer of `view`.
///
/// Entries without a usable range are skipped.
pub fn diagnostics_from_value(
    workspace: &Workspace,
    view: ViewId,
    diagnostics: &Value,
) -> Result<Vec<DiagnosticItem>, WorkspaceError> {
    let buffer_id = workspace.buffer_id_for_view(view)?;
    let buffer = workspace
        .buffer(buffer_id)
        .ok_or(WorkspaceError::BufferNotFound(buffer_id))?;
    Ok(diagnostics
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|d| DiagnosticItem::from_value(buffer, d))
                .collect()
        })
        .unwrap_or_default())
}

/// Replace the diagnostics shown on `view` with `items`.
pub fn show_diagnostics(
    workspace: &mut Workspace,
    view: ViewId,
    items: &[DiagnosticItem],
) -> Result<DiagnosticSummary, WorkspaceError> {
    let regions = items.iter().map(|item| item.region).collect();
    workspace.add_regions(
        view,
        DIAGNOSTICS_KEY,
        regions,
        RegionStyle::new("invalid", SQUIGGLY_FLAGS).with_icon("dot"),
    )?;
    let summary = DiagnosticSummary::from_items(items);
    tracing::debug!(view = ?view, errors = summary.errors, warnings = summary.warnings, "diagnostics shown");
    Ok(summary)
}

/// Remove the diagnostics shown on `view`.
pub fn clear_diagnostics(workspace: &mut Workspace, view: ViewId) -> Result<bool, WorkspaceError> {
    workspace.erase_regions(view, DIAGNOSTICS_KEY)
}
