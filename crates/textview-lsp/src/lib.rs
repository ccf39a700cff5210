#![warn(missing_docs)]
//! `textview-lsp` - language-server integration helpers for `textview-core`.
//!
//! This crate drives a [`textview_core::Workspace`] from a language-server-like producer:
//! batched `(row, column)` text changes applied in one edit session, diagnostics shown as a
//! `"diagnostics"` region collection with a severity summary, and document highlights shown as a
//! `"highlight"` region collection. Payloads are parsed from `serde_json::Value` without pulling
//! in a full `lsp-types` dependency.

pub mod diagnostics;
pub mod highlights;
pub mod text_changes;

pub use diagnostics::{
    DIAGNOSTICS_KEY, DiagnosticItem, DiagnosticSeverity, DiagnosticSummary, SQUIGGLY_FLAGS,
    clear_diagnostics, diagnostics_from_value, show_diagnostics,
};
pub use highlights::{
    HIGHLIGHT_KEY, clear_all_highlights, clear_highlight, document_highlights_to_regions,
    highlight_text,
};
pub use text_changes::{ChangeError, TextChange, apply_text_changes};
