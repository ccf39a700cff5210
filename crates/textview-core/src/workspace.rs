//! Workspace: the buffer/view arena and the command dispatch boundary.
//!
//! A [`Workspace`] owns every open [`Buffer`] and [`View`]; the rest of the crate refers to them
//! by [`BufferId`] / [`ViewId`]. Commands run against a view through
//! [`Workspace::run_command`], which opens an edit session on the view's buffer, closes it on
//! every exit path and syncs all views of that buffer afterwards.
//!
//! Work that completes later (for example a reply from an external process) captures an
//! [`Anchor`] first and resolves its regions against the current content when it arrives. If the
//! view was closed in the meantime, the result is dropped without error.

use crate::buffer::{Buffer, BufferId, Edit};
use crate::config::WorkspaceConfig;
use crate::delta::TextDelta;
use crate::error::ModelError;
use crate::flags::RegionFlags;
use crate::mapper::VersionStamp;
use crate::persist::PersistedRegions;
use crate::phantom::{Phantom, PhantomId, PlacedPhantom};
use crate::region::{Point, Region};
use crate::selection::Selection;
use crate::view::{RegionStyle, View, ViewId};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Errors from workspace lookups and lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// Another open buffer already uses this uri.
    #[error("a buffer is already open for {0}")]
    UriAlreadyOpen(String),
    /// No open buffer has this id.
    #[error("buffer {0:?} not found")]
    BufferNotFound(BufferId),
    /// No open view has this id.
    #[error("view {0:?} not found")]
    ViewNotFound(ViewId),
    /// The buffer model rejected an operation.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Ids handed back by [`Workspace::open_buffer`]; every buffer opens with one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenBufferResult {
    /// Id of the new buffer.
    pub buffer_id: BufferId,
    /// Id of its first view.
    pub view_id: ViewId,
}

/// A captured `(view, buffer, version)` position for resolving deferred results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// View the result belongs to.
    pub view: ViewId,
    /// Buffer of that view.
    pub buffer: BufferId,
    /// Version the result's positions refer to.
    pub stamp: VersionStamp,
}

/// What a command handler may touch while its session is open.
pub struct CommandContext<'a> {
    view_id: ViewId,
    buffer: &'a mut Buffer,
    view: &'a mut View,
    edit: &'a Edit,
}

impl CommandContext<'_> {
    /// The view the command runs against.
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// The buffer being edited.
    pub fn buffer(&self) -> &Buffer {
        self.buffer
    }

    /// Current position in the buffer's history, including this session's mutations.
    pub fn stamp(&self) -> VersionStamp {
        self.buffer.stamp()
    }

    /// Insert `text` at `point`.
    pub fn insert(&mut self, point: Point, text: &str) -> Result<usize, ModelError> {
        self.buffer.insert(self.edit, point, text)
    }

    /// Erase the span of `region`.
    pub fn erase(&mut self, region: Region) -> Result<(), ModelError> {
        self.buffer.erase(self.edit, region)
    }

    /// Replace the span of `region` with `text`.
    pub fn replace(&mut self, region: Region, text: &str) -> Result<usize, ModelError> {
        self.buffer.replace(self.edit, region, text)
    }

    /// The view's selection, remapped through the mutations applied so far.
    pub fn sel(&self) -> Result<Selection, ModelError> {
        self.view.selection_at(self.buffer)
    }

    /// Mutable access to the view's selection, remapped through the mutations applied so far.
    pub fn sel_mut(&mut self) -> Result<&mut Selection, ModelError> {
        self.view.selection_mut(self.buffer)
    }
}

/// Arena of open buffers and the views looking at them.
#[derive(Default)]
pub struct Workspace {
    config: WorkspaceConfig,
    buffers: BTreeMap<BufferId, Buffer>,
    uri_to_buffer: HashMap<String, BufferId>,

    next_view_id: u64,
    views: BTreeMap<ViewId, View>,
    active_view: Option<ViewId>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("buffer_count", &self.buffers.len())
            .field("view_count", &self.views.len())
            .field("uri_count", &self.uri_to_buffer.len())
            .field("active_view", &self.active_view)
            .finish()
    }
}

impl Workspace {
    /// Create an empty workspace with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty workspace with the given settings.
    pub fn with_config(config: WorkspaceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Workspace settings.
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Open buffer count.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// `true` when no buffer is open.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Open view count.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// View that last received focus, if any view is open.
    pub fn active_view_id(&self) -> Option<ViewId> {
        self.active_view
    }

    /// Buffer of the active view.
    pub fn active_buffer_id(&self) -> Option<BufferId> {
        let view_id = self.active_view?;
        self.views.get(&view_id).map(View::buffer_id)
    }

    /// Set the active view.
    pub fn set_active_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        if !self.views.contains_key(&id) {
            return Err(WorkspaceError::ViewNotFound(id));
        }
        self.active_view = Some(id);
        Ok(())
    }

    /// Open a new buffer, creating an initial view.
    ///
    /// `uri` is the buffer's file identity; it must be unique among open buffers.
    pub fn open_buffer(
        &mut self,
        uri: Option<String>,
        text: &str,
    ) -> Result<OpenBufferResult, WorkspaceError> {
        if let Some(uri) = uri.as_ref()
            && self.uri_to_buffer.contains_key(uri)
        {
            return Err(WorkspaceError::UriAlreadyOpen(uri.clone()));
        }

        let mut buffer = Buffer::new(text);
        buffer.set_name(uri.clone());
        let buffer_id = buffer.id();
        self.buffers.insert(buffer_id, buffer);

        if let Some(uri) = uri {
            self.uri_to_buffer.insert(uri, buffer_id);
        }

        let view_id = self.create_view(buffer_id)?;
        if self.active_view.is_none() {
            self.active_view = Some(view_id);
        }
        tracing::debug!(buffer = ?buffer_id, view = ?view_id, "buffer opened");

        Ok(OpenBufferResult { buffer_id, view_id })
    }

    /// Close a buffer together with every view into it.
    pub fn close_buffer(&mut self, id: BufferId) -> Result<(), WorkspaceError> {
        let Some(buffer) = self.buffers.remove(&id) else {
            return Err(WorkspaceError::BufferNotFound(id));
        };

        if let Some(uri) = buffer.name() {
            self.uri_to_buffer.remove(uri);
        }

        self.views.retain(|_, v| v.buffer_id() != id);
        if self
            .active_view
            .is_some_and(|active| !self.views.contains_key(&active))
        {
            self.active_view = self.views.keys().next().copied();
        }
        tracing::debug!(buffer = ?id, "buffer closed");

        Ok(())
    }

    /// Close a view. Closing the last view of a buffer closes the buffer too.
    pub fn close_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        let Some(view) = self.views.remove(&id) else {
            return Err(WorkspaceError::ViewNotFound(id));
        };
        tracing::debug!(view = ?id, "view closed");

        if self.active_view == Some(id) {
            self.active_view = self.views.keys().next().copied();
        }

        let buffer = view.buffer_id();
        let still_has_views = self.views.values().any(|v| v.buffer_id() == buffer);
        if !still_has_views {
            self.close_buffer(buffer)?;
        }

        Ok(())
    }

    /// Open another view into `buffer`, starting with a caret at 0.
    pub fn create_view(&mut self, buffer: BufferId) -> Result<ViewId, WorkspaceError> {
        let Some(entry) = self.buffers.get(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };

        let view_id = ViewId(self.next_view_id);
        self.next_view_id = self.next_view_id.saturating_add(1);
        let view = View::new(
            view_id,
            entry,
            self.config.viewport_width,
            self.config.viewport_height,
        );
        self.views.insert(view_id, view);

        Ok(view_id)
    }

    /// Buffer opened under `uri`, if any.
    pub fn buffer_id_for_uri(&self, uri: &str) -> Option<BufferId> {
        self.uri_to_buffer.get(uri).copied()
    }

    /// Buffer shown by a view.
    pub fn buffer_id_for_view(&self, id: ViewId) -> Result<BufferId, WorkspaceError> {
        self.views
            .get(&id)
            .map(View::buffer_id)
            .ok_or(WorkspaceError::ViewNotFound(id))
    }

    /// Ids of every open view, in creation order.
    pub fn view_ids(&self) -> Vec<ViewId> {
        self.views.keys().copied().collect()
    }

    /// Ids of every view into `buffer`, in creation order.
    pub fn views_of(&self, buffer: BufferId) -> Vec<ViewId> {
        self.views
            .values()
            .filter(|v| v.buffer_id() == buffer)
            .map(View::id)
            .collect()
    }

    /// Borrow a buffer.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    /// Borrow a buffer mutably. Views remap lazily, so edits made here are visible to them.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }

    /// Borrow a view.
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// Borrow a view mutably together with its buffer.
    pub fn view_and_buffer_mut(&mut self, id: ViewId) -> Option<(&mut View, &Buffer)> {
        let view = self.views.get_mut(&id)?;
        let buffer = self.buffers.get(&view.buffer_id())?;
        Some((view, buffer))
    }

    fn view_and_buffer(&self, id: ViewId) -> Result<(&View, &Buffer), WorkspaceError> {
        let view = self.views.get(&id).ok_or(WorkspaceError::ViewNotFound(id))?;
        let buffer_id = view.buffer_id();
        let buffer = self
            .buffers
            .get(&buffer_id)
            .ok_or(WorkspaceError::BufferNotFound(buffer_id))?;
        Ok((view, buffer))
    }

    fn split_mut(&mut self, id: ViewId) -> Result<(&mut View, &mut Buffer), WorkspaceError> {
        let view = self.views.get_mut(&id).ok_or(WorkspaceError::ViewNotFound(id))?;
        let buffer_id = view.buffer_id();
        let buffer = self
            .buffers
            .get_mut(&buffer_id)
            .ok_or(WorkspaceError::BufferNotFound(buffer_id))?;
        Ok((view, buffer))
    }

    fn view_parts(&mut self, id: ViewId) -> Result<(&mut View, &Buffer), WorkspaceError> {
        self.split_mut(id).map(|(view, buffer)| (view, &*buffer))
    }

    /// Fold pending remaps into every view of `buffer`.
    pub fn sync_views(&mut self, buffer: BufferId) -> Result<(), WorkspaceError> {
        let Some(entry) = self.buffers.get(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };
        for view in self.views.values_mut().filter(|v| v.buffer_id() == buffer) {
            view.sync(entry)?;
        }
        Ok(())
    }

    /// Run `f` inside an edit session on the view's buffer.
    ///
    /// The session is closed whether `f` succeeds or fails; mutations applied before a failure
    /// stay committed. All views of the buffer are synced afterwards.
    pub fn run_command<T, F>(&mut self, view: ViewId, f: F) -> Result<(T, TextDelta), WorkspaceError>
    where
        F: FnOnce(&mut CommandContext<'_>) -> Result<T, WorkspaceError>,
    {
        let (view_ref, buffer) = self.split_mut(view)?;
        let buffer_id = buffer.id();
        view_ref.sync(buffer)?;

        let edit = buffer.begin_edit()?;
        let result = {
            let mut ctx = CommandContext {
                view_id: view,
                buffer: &mut *buffer,
                view: &mut *view_ref,
                edit: &edit,
            };
            f(&mut ctx)
        };
        let delta = buffer.end_edit(edit)?;
        if let Err(err) = &result {
            tracing::debug!(view = ?view, error = %err, "command failed");
        }

        self.sync_views(buffer_id)?;
        result.map(|value| (value, delta))
    }

    /// Capture the view's current position in its buffer's history.
    pub fn capture(&self, view: ViewId) -> Result<Anchor, WorkspaceError> {
        let (view_ref, buffer) = self.view_and_buffer(view)?;
        Ok(Anchor {
            view: view_ref.id(),
            buffer: buffer.id(),
            stamp: buffer.stamp(),
        })
    }

    /// Remap `region`, recorded at `anchor`, onto the current content.
    ///
    /// Returns `Ok(None)` if the anchor's view has been closed.
    pub fn resolve_region(&self, anchor: &Anchor, region: Region) -> Result<Option<Region>, WorkspaceError> {
        let Some(buffer) = self.live_anchor_buffer(anchor) else {
            return Ok(None);
        };
        Ok(Some(buffer.transform_region_from(region, anchor.stamp)?))
    }

    /// Replace `region`, recorded at `anchor`, in a fresh session.
    ///
    /// Returns `Ok(None)` if the anchor's view has been closed.
    pub fn apply_deferred_replace(
        &mut self,
        anchor: &Anchor,
        region: Region,
        text: &str,
    ) -> Result<Option<TextDelta>, WorkspaceError> {
        let Some(target) = self.resolve_region(anchor, region)? else {
            return Ok(None);
        };
        let (_, delta) = self.run_command(anchor.view, |ctx| {
            ctx.replace(target, text)?;
            Ok(())
        })?;
        Ok(Some(delta))
    }

    fn live_anchor_buffer(&self, anchor: &Anchor) -> Option<&Buffer> {
        let alive = self
            .views
            .get(&anchor.view)
            .is_some_and(|v| v.buffer_id() == anchor.buffer);
        if !alive {
            tracing::debug!(view = ?anchor.view, "view closed; deferred result dropped");
            return None;
        }
        self.buffers.get(&anchor.buffer)
    }

    /// The view's selection, remapped to the current content.
    pub fn selection(&self, view: ViewId) -> Result<Selection, WorkspaceError> {
        let (view, buffer) = self.view_and_buffer(view)?;
        Ok(view.selection_at(buffer)?)
    }

    /// Mutable access to the view's selection.
    pub fn selection_mut(&mut self, view: ViewId) -> Result<&mut Selection, WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        Ok(view.selection_mut(buffer)?)
    }

    /// Add `region` to the view's selection, clamped to the buffer.
    pub fn add_selection(&mut self, view: ViewId, region: Region) -> Result<(), WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        Ok(view.add_selection(buffer, region)?)
    }

    /// Set the viewport height of a view.
    pub fn set_viewport_height(&mut self, view: ViewId, height: Option<usize>) -> Result<(), WorkspaceError> {
        let (view, _) = self.view_parts(view)?;
        view.viewport_mut().height = height;
        Ok(())
    }

    /// Set the first visible line of a view, clamped to the buffer.
    pub fn set_scroll_top(&mut self, view: ViewId, line: usize) -> Result<(), WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        view.viewport_mut().scroll_top = line.min(buffer.line_count().saturating_sub(1));
        Ok(())
    }

    /// Region covering the visible lines of a view.
    pub fn visible_region(&self, view: ViewId) -> Result<Region, WorkspaceError> {
        let (view, buffer) = self.view_and_buffer(view)?;
        Ok(view.visible_region(buffer))
    }

    /// Scroll a view so the active end of `region` is visible.
    pub fn show(&mut self, view: ViewId, region: Region) -> Result<(), WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        view.show(buffer, region);
        Ok(())
    }

    /// Store a named region collection on a view.
    pub fn add_regions(
        &mut self,
        view: ViewId,
        key: &str,
        regions: Vec<Region>,
        style: RegionStyle,
    ) -> Result<(), WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        view.add_regions(buffer, key, regions, style);
        Ok(())
    }

    /// Regions stored under `key`, remapped to the current content.
    pub fn get_regions(&self, view: ViewId, key: &str) -> Result<Vec<Region>, WorkspaceError> {
        let (view, buffer) = self.view_and_buffer(view)?;
        Ok(view.get_regions(buffer, key)?)
    }

    /// Remove the collection stored under `key`.
    pub fn erase_regions(&mut self, view: ViewId, key: &str) -> Result<bool, WorkspaceError> {
        let (view, _) = self.view_parts(view)?;
        Ok(view.erase_regions(key))
    }

    /// Place a phantom on a view.
    pub fn add_phantom(&mut self, view: ViewId, key: &str, phantom: Phantom) -> Result<PhantomId, WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        Ok(view.add_phantom(buffer, key, phantom))
    }

    /// Remove every phantom placed under `key`.
    pub fn erase_phantoms(&mut self, view: ViewId, key: &str) -> Result<(), WorkspaceError> {
        let (view, _) = self.view_parts(view)?;
        view.erase_phantoms(key);
        Ok(())
    }

    /// Remove one phantom.
    pub fn erase_phantom_by_id(&mut self, view: ViewId, id: PhantomId) -> Result<bool, WorkspaceError> {
        let (view, _) = self.view_parts(view)?;
        Ok(view.erase_phantom_by_id(id))
    }

    /// Current anchor of a phantom.
    pub fn query_phantom(&self, view: ViewId, id: PhantomId) -> Result<Option<Region>, WorkspaceError> {
        let (view, buffer) = self.view_and_buffer(view)?;
        Ok(view.query_phantom(buffer, id)?)
    }

    /// All phantoms of a view with their current anchors.
    pub fn phantoms(&self, view: ViewId) -> Result<Vec<PlacedPhantom>, WorkspaceError> {
        let (view, buffer) = self.view_and_buffer(view)?;
        Ok(view.phantoms(buffer)?)
    }

    /// Export the `PERSISTENT` collections of every view of `buffer`.
    ///
    /// Buffers without a file identity export nothing. When several views carry the same key,
    /// the oldest view wins.
    pub fn persistent_regions(&self, buffer: BufferId) -> Result<Vec<PersistedRegions>, WorkspaceError> {
        let entry = self
            .buffers
            .get(&buffer)
            .ok_or(WorkspaceError::BufferNotFound(buffer))?;
        let Some(file) = entry.name() else {
            return Ok(Vec::new());
        };
        if !self.config.persist_regions {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for view in self.views.values().filter(|v| v.buffer_id() == buffer) {
            for (key, regions, style) in view.persistent_collections(entry)? {
                if seen.insert(key.clone()) {
                    out.push(PersistedRegions::new(file, &key, &regions, style));
                }
            }
        }
        Ok(out)
    }

    /// Re-import persisted collections matching the view's file identity.
    ///
    /// Returns the number of collections restored.
    pub fn restore_persistent_regions(
        &mut self,
        view: ViewId,
        items: &[PersistedRegions],
    ) -> Result<usize, WorkspaceError> {
        let (view, buffer) = self.view_parts(view)?;
        let Some(file) = buffer.name() else {
            return Ok(0);
        };

        let mut restored = 0;
        for item in items.iter().filter(|item| item.file == file) {
            let mut style = item.style.clone();
            style.flags |= RegionFlags::PERSISTENT;
            view.add_regions(buffer, &item.key, item.to_regions(), style);
            restored += 1;
        }
        Ok(restored)
    }
}
