#![warn(missing_docs)]
//! Textview Core - Headless Region, Selection and Versioned Buffer Model
//!
//! # Overview
//!
//! `textview-core` is the position model underneath a multi-view text editor. It does not render
//! anything; hosts drive it through a [`Workspace`] of buffers and views and read back regions,
//! selections and phantoms expressed as character offsets.
//!
//! # Core Features
//!
//! - **Region algebra**: directional `[a, b]` spans with cover/intersection and strict
//!   intersection semantics ([`Region`])
//! - **Merging selections**: ordered, non-intersecting region sets ([`Selection`])
//! - **Edit sessions**: token-gated mutation batches, one version per non-empty session
//!   ([`Buffer`], [`Edit`])
//! - **Position remapping**: regions recorded at any stamp map onto later content through an
//!   append-only mutation log ([`PositionMapper`], [`VersionStamp`])
//! - **Decorations**: named region collections and phantoms that follow edits, reconciled by
//!   [`PhantomSet`]
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workspace (arena, commands, deferred work) │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Views (selection, regions, phantoms)       │  ← Per-pane state
//! ├─────────────────────────────────────────────┤
//! │  PositionMapper (mutation log)              │  ← Remapping
//! ├─────────────────────────────────────────────┤
//! │  Buffer (sessions, versions)                │  ← Mutation
//! ├─────────────────────────────────────────────┤
//! │  Rope text storage                          │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use textview_core::{Region, Workspace};
//!
//! let mut ws = Workspace::new();
//! let opened = ws.open_buffer(None, "hello world").unwrap();
//! ws.add_selection(opened.view_id, Region::new(6, 11)).unwrap();
//!
//! let anchor = ws.capture(opened.view_id).unwrap();
//! ws.run_command(opened.view_id, |ctx| {
//!     ctx.insert(0, ">> ")?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(ws.resolve_region(&anchor, Region::new(6, 11)).unwrap(), Some(Region::new(9, 14)));
//! ```
//!
//! # Module Description
//!
//! - [`region`] - Region interval algebra
//! - [`selection`] - Ordered merging region set
//! - [`buffer`] - Buffer content, edit sessions and versioning
//! - [`mapper`] - Version stamps and position remapping
//! - [`view`] - Per-view selection, viewport and decorations
//! - [`phantom`] - Phantom reconciliation
//! - [`workspace`] - Buffer/view arena and command dispatch

pub mod buffer;
pub mod config;
pub mod delta;
mod error;
pub mod flags;
pub mod mapper;
pub mod persist;
pub mod phantom;
pub mod region;
pub mod selection;
mod text;
pub mod view;
pub mod workspace;

pub use buffer::{Buffer, BufferId, Edit};
pub use config::WorkspaceConfig;
pub use delta::{TextDelta, TextDeltaEdit};
pub use error::ModelError;
pub use flags::RegionFlags;
pub use mapper::{Bias, MutationRecord, PositionMapper, VersionStamp};
pub use persist::PersistedRegions;
pub use phantom::{
    NavigateCallback, Phantom, PhantomDiff, PhantomId, PhantomLayout, PhantomSet, PlacedPhantom,
};
pub use region::{Point, Region};
pub use selection::Selection;
pub use view::{RegionStyle, View, ViewId, Viewport};
pub use workspace::{Anchor, CommandContext, OpenBufferResult, Workspace, WorkspaceError};
