//! Views: per-pane projections of a shared buffer.
//!
//! A [`View`] exclusively owns its [`Selection`], viewport, named region collections and placed
//! phantoms. Everything position-bearing is stored together with the [`VersionStamp`] it was
//! recorded at and remapped through the buffer's mutation log on access, so a view never needs
//! to be notified of edits to stay correct. [`View::sync`] folds pending remaps into the stored
//! state.
//!
//! Selection sync differs from the plain mapper rule for carets: an empty region maps as a single
//! point and lands after text inserted at (or replacing) its position.

use crate::buffer::{Buffer, BufferId};
use crate::error::ModelError;
use crate::flags::RegionFlags;
use crate::mapper::{Bias, VersionStamp};
use crate::phantom::{Phantom, PhantomId, PlacedPhantom};
use crate::region::Region;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque identifier for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub(crate) u64);

impl ViewId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Viewport state of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Viewport width (in cells).
    pub width: usize,
    /// Viewport height in lines, if known.
    pub height: Option<usize>,
    /// First visible line.
    pub scroll_top: usize,
}

/// Presentation attributes of a named region collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStyle {
    /// Scope name used to pick colors.
    #[serde(default)]
    pub scope: String,
    /// Gutter icon name (empty for none).
    #[serde(default)]
    pub icon: String,
    /// Draw and storage flags.
    #[serde(default)]
    pub flags: RegionFlags,
}

impl RegionStyle {
    /// Create a style with the given scope and flags and no icon.
    pub fn new(scope: impl Into<String>, flags: RegionFlags) -> Self {
        Self {
            scope: scope.into(),
            icon: String::new(),
            flags,
        }
    }

    /// Set the gutter icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

#[derive(Debug, Clone)]
struct RegionCollection {
    regions: Vec<Region>,
    style: RegionStyle,
    stamp: VersionStamp,
}

#[derive(Debug, Clone)]
struct StoredPhantom {
    id: PhantomId,
    key: String,
    phantom: Phantom,
    stamp: VersionStamp,
}

/// A projection of a buffer with its own selection and viewport.
#[derive(Debug, Clone)]
pub struct View {
    id: ViewId,
    buffer: BufferId,
    selection: Selection,
    synced_at: VersionStamp,
    viewport: Viewport,
    regions: BTreeMap<String, RegionCollection>,
    phantoms: Vec<StoredPhantom>,
    next_phantom_id: u64,
}

impl View {
    pub(crate) fn new(id: ViewId, buffer: &Buffer, viewport_width: usize, height: Option<usize>) -> Self {
        let mut selection = Selection::new();
        selection.add(Region::caret(0));
        Self {
            id,
            buffer: buffer.id(),
            selection,
            synced_at: buffer.stamp(),
            viewport: Viewport {
                width: viewport_width.max(1),
                height,
                scroll_top: 0,
            },
            regions: BTreeMap::new(),
            phantoms: Vec::new(),
            next_phantom_id: 1,
        }
    }

    /// This view's id.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// The buffer this view projects.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// Stamp the stored state was last synced at.
    pub fn synced_at(&self) -> VersionStamp {
        self.synced_at
    }

    /// Remap all stored positions to the buffer's current content.
    pub fn sync(&mut self, buffer: &Buffer) -> Result<(), ModelError> {
        let now = buffer.stamp();
        if now == self.synced_at {
            return Ok(());
        }

        self.selection = self.selection_at(buffer)?;
        for collection in self.regions.values_mut() {
            collection.regions = remap_all(buffer, &collection.regions, collection.stamp)?;
            collection.stamp = now;
        }
        for stored in &mut self.phantoms {
            stored.phantom.region = buffer.transform_region_from(stored.phantom.region, stored.stamp)?;
            stored.stamp = now;
        }
        self.synced_at = now;
        Ok(())
    }

    /// The selection remapped to the buffer's current content.
    pub fn selection_at(&self, buffer: &Buffer) -> Result<Selection, ModelError> {
        self.selection
            .iter()
            .map(|region| {
                if region.is_empty() {
                    buffer
                        .transform_point_from(region.a, Bias::End, self.synced_at)
                        .map(|p| Region::caret(p).with_xpos(region.xpos))
                } else {
                    buffer.transform_region_from(*region, self.synced_at)
                }
            })
            .collect()
    }

    /// Mutable access to the selection, synced first.
    pub fn selection_mut(&mut self, buffer: &Buffer) -> Result<&mut Selection, ModelError> {
        self.sync(buffer)?;
        Ok(&mut self.selection)
    }

    /// Add `region` to the selection, clamped to the buffer.
    pub fn add_selection(&mut self, buffer: &Buffer, region: Region) -> Result<(), ModelError> {
        self.selection_mut(buffer)?.add(region.clamp_to(buffer.size()));
        Ok(())
    }

    /// Viewport state.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Region covering the visible lines.
    pub fn visible_region(&self, buffer: &Buffer) -> Region {
        let last_row = buffer.line_count().saturating_sub(1);
        let top = self.viewport.scroll_top.min(last_row);
        let bottom = match self.viewport.height {
            Some(height) => (top + height.max(1) - 1).min(last_row),
            None => last_row,
        };
        let begin = buffer.text_point(top, 0);
        let end = buffer.text_point(bottom, usize::MAX);
        Region::new(begin, end)
    }

    /// Scroll the minimum amount needed to bring the active end of `region` into view.
    pub fn show(&mut self, buffer: &Buffer, region: Region) {
        let (row, _) = buffer.rowcol(region.b);
        let Some(height) = self.viewport.height else {
            return;
        };
        let height = height.max(1);
        if row < self.viewport.scroll_top {
            self.viewport.scroll_top = row;
        } else if row >= self.viewport.scroll_top + height {
            self.viewport.scroll_top = row + 1 - height;
        }
    }

    /// Store a named region collection, replacing any previous one with the same key.
    ///
    /// Regions are clamped to the buffer and kept sorted.
    pub fn add_regions(&mut self, buffer: &Buffer, key: &str, regions: Vec<Region>, style: RegionStyle) {
        let size = buffer.size();
        let mut regions: Vec<Region> = regions.into_iter().map(|r| r.clamp_to(size)).collect();
        regions.sort();
        self.regions.insert(
            key.to_string(),
            RegionCollection {
                regions,
                style,
                stamp: buffer.stamp(),
            },
        );
    }

    /// The regions stored under `key`, remapped to the current content (empty if none).
    pub fn get_regions(&self, buffer: &Buffer, key: &str) -> Result<Vec<Region>, ModelError> {
        match self.regions.get(key) {
            Some(collection) => remap_all(buffer, &collection.regions, collection.stamp),
            None => Ok(Vec::new()),
        }
    }

    /// Style of the collection stored under `key`.
    pub fn region_style(&self, key: &str) -> Option<&RegionStyle> {
        self.regions.get(key).map(|c| &c.style)
    }

    /// Remove the collection stored under `key`. Returns `true` if one existed.
    pub fn erase_regions(&mut self, key: &str) -> bool {
        self.regions.remove(key).is_some()
    }

    /// Keys of all stored region collections, sorted.
    pub fn region_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.regions.keys().map(String::as_str)
    }

    /// Place a phantom under `key`. Its region is clamped to the buffer.
    pub fn add_phantom(&mut self, buffer: &Buffer, key: &str, mut phantom: Phantom) -> PhantomId {
        let id = PhantomId(self.next_phantom_id);
        self.next_phantom_id += 1;
        phantom.region = phantom.region.clamp_to(buffer.size());
        self.phantoms.push(StoredPhantom {
            id,
            key: key.to_string(),
            phantom,
            stamp: buffer.stamp(),
        });
        id
    }

    pub(crate) fn move_phantom(&mut self, id: PhantomId, region: Region, buffer: &Buffer) {
        if let Some(stored) = self.phantoms.iter_mut().find(|p| p.id == id) {
            stored.phantom.region = region;
            stored.stamp = buffer.stamp();
        }
    }

    /// Remove every phantom placed under `key`.
    pub fn erase_phantoms(&mut self, key: &str) {
        self.phantoms.retain(|p| p.key != key);
    }

    /// Remove one phantom. Returns `true` if it existed.
    pub fn erase_phantom_by_id(&mut self, id: PhantomId) -> bool {
        let before = self.phantoms.len();
        self.phantoms.retain(|p| p.id != id);
        self.phantoms.len() != before
    }

    /// Current anchor of a phantom.
    pub fn query_phantom(&self, buffer: &Buffer, id: PhantomId) -> Result<Option<Region>, ModelError> {
        self.phantoms
            .iter()
            .find(|p| p.id == id)
            .map(|p| buffer.transform_region_from(p.phantom.region, p.stamp))
            .transpose()
    }

    /// Current anchors of the given phantoms; unknown ids are skipped.
    pub fn query_phantoms(&self, buffer: &Buffer, ids: &[PhantomId]) -> Result<Vec<Region>, ModelError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(region) = self.query_phantom(buffer, *id)? {
                out.push(region);
            }
        }
        Ok(out)
    }

    /// Phantoms placed under `key` with their current anchors, in placement order.
    pub fn placed_phantoms(&self, buffer: &Buffer, key: &str) -> Result<Vec<PlacedPhantom>, ModelError> {
        self.phantoms
            .iter()
            .filter(|p| p.key == key)
            .map(|p| placed(buffer, p))
            .collect()
    }

    /// All phantoms with their current anchors, sorted by anchor.
    pub fn phantoms(&self, buffer: &Buffer) -> Result<Vec<PlacedPhantom>, ModelError> {
        let mut all = self
            .phantoms
            .iter()
            .map(|p| placed(buffer, p))
            .collect::<Result<Vec<_>, _>>()?;
        all.sort_by(|a, b| a.phantom.region.cmp(&b.phantom.region).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    /// Invoke the navigation callback of a phantom. Returns `false` if the phantom does not exist
    /// or has no callback.
    pub fn navigate_phantom(&self, id: PhantomId, href: &str) -> bool {
        let Some(callback) = self
            .phantoms
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| p.phantom.on_navigate.clone())
        else {
            return false;
        };
        callback(href);
        true
    }

    /// Collections flagged [`RegionFlags::PERSISTENT`], remapped to the current content.
    pub(crate) fn persistent_collections(
        &self,
        buffer: &Buffer,
    ) -> Result<Vec<(String, Vec<Region>, RegionStyle)>, ModelError> {
        self.regions
            .iter()
            .filter(|(_, c)| c.style.flags.contains(RegionFlags::PERSISTENT))
            .map(|(key, c)| {
                remap_all(buffer, &c.regions, c.stamp).map(|r| (key.clone(), r, c.style.clone()))
            })
            .collect()
    }
}

fn placed(buffer: &Buffer, stored: &StoredPhantom) -> Result<PlacedPhantom, ModelError> {
    let mut phantom = stored.phantom.clone();
    phantom.region = buffer.transform_region_from(phantom.region, stored.stamp)?;
    Ok(PlacedPhantom {
        id: stored.id,
        key: stored.key.clone(),
        phantom,
    })
}

fn remap_all(buffer: &Buffer, regions: &[Region], stamp: VersionStamp) -> Result<Vec<Region>, ModelError> {
    regions
        .iter()
        .map(|r| buffer.transform_region_from(*r, stamp))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phantom::PhantomLayout;
    use pretty_assertions::assert_eq;

    fn view_for(buffer: &Buffer) -> View {
        View::new(ViewId(1), buffer, 80, Some(2))
    }

    fn insert(buffer: &mut Buffer, at: usize, text: &str) {
        buffer.edit(|b, e| b.insert(e, at, text).map(|_| ())).unwrap();
    }

    #[test]
    fn test_new_view_has_caret_at_start() {
        let buffer = Buffer::new("abc");
        let view = view_for(&buffer);
        assert_eq!(view.selection_at(&buffer).unwrap().as_slice(), &[Region::caret(0)]);
    }

    #[test]
    fn test_caret_follows_insertion_at_its_position() {
        let mut buffer = Buffer::new("hello world");
        let mut view = view_for(&buffer);
        view.selection_mut(&buffer).unwrap().clear();
        view.add_selection(&buffer, Region::caret(5)).unwrap();
        view.add_selection(&buffer, Region::new(6, 11)).unwrap();

        insert(&mut buffer, 5, "!");
        view.sync(&buffer).unwrap();
        let sel: Vec<_> = view.selection_mut(&buffer).unwrap().iter().copied().collect();
        assert_eq!(sel, vec![Region::caret(6), Region::new(7, 12)]);
    }

    #[test]
    fn test_add_selection_clamps() {
        let buffer = Buffer::new("abc");
        let mut view = view_for(&buffer);
        view.add_selection(&buffer, Region::new(1, 40)).unwrap();
        assert_eq!(view.selection_at(&buffer).unwrap().get(1), Some(Region::new(1, 3)));
    }

    #[test]
    fn test_named_regions_track_edits() {
        let mut buffer = Buffer::new("let x = 1;");
        let mut view = view_for(&buffer);
        view.add_regions(
            &buffer,
            "diag",
            vec![Region::new(4, 5)],
            RegionStyle::new("invalid", RegionFlags::DRAW_SQUIGGLY_UNDERLINE).with_icon("dot"),
        );
        insert(&mut buffer, 0, "    ");
        assert_eq!(view.get_regions(&buffer, "diag").unwrap(), vec![Region::new(8, 9)]);
        assert_eq!(view.region_style("diag").unwrap().icon, "dot");
        assert!(view.get_regions(&buffer, "missing").unwrap().is_empty());
        assert!(view.erase_regions("diag"));
        assert!(!view.erase_regions("diag"));
    }

    #[test]
    fn test_phantoms_track_edits() {
        let mut buffer = Buffer::new("abc\ndef\n");
        let mut view = view_for(&buffer);
        let id = view.add_phantom(
            &buffer,
            "hints",
            Phantom::new(Region::new(4, 7), "<b>def</b>", PhantomLayout::Below),
        );
        insert(&mut buffer, 0, "xx");
        assert_eq!(view.query_phantom(&buffer, id).unwrap(), Some(Region::new(6, 9)));
        view.sync(&buffer).unwrap();
        assert_eq!(view.query_phantoms(&buffer, &[id]).unwrap(), vec![Region::new(6, 9)]);
        view.erase_phantoms("hints");
        assert_eq!(view.query_phantom(&buffer, id).unwrap(), None);
    }

    #[test]
    fn test_show_scrolls_minimally() {
        let buffer = Buffer::new("0\n1\n2\n3\n4\n5");
        let mut view = view_for(&buffer);
        view.show(&buffer, Region::caret(buffer.text_point(4, 0)));
        assert_eq!(view.viewport().scroll_top, 3);
        assert_eq!(view.visible_region(&buffer), Region::new(6, 9));
        view.show(&buffer, Region::caret(0));
        assert_eq!(view.viewport().scroll_top, 0);
    }
}
