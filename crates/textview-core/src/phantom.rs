//! Phantoms: non-text decorations anchored to regions.
//!
//! A view stores placed phantoms with the version stamp their region was recorded at, so the
//! anchors follow later edits. [`PhantomSet`] owns the phantoms of one `(view, key)` pair and
//! reconciles them against a desired list:
//!
//! 1. every placed phantom is remapped to the current version,
//! 2. desired phantoms are matched to placed ones with the same identity key
//!    (`content`, `layout`, callback identity), nearest anchor first,
//! 3. matched phantoms whose region changed are moved in place (keeping their id), unmatched
//!    desired phantoms are added and unmatched placed phantoms are removed.
//!
//! Calling [`PhantomSet::update`] twice with the same list and no edits in between is a no-op the
//! second time.

use crate::region::Region;
use crate::view::ViewId;
use crate::workspace::{Workspace, WorkspaceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the `href` of a link activated inside a phantom.
pub type NavigateCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Where a phantom is laid out relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhantomLayout {
    /// Inline with the text, at the anchor.
    #[default]
    Inline,
    /// Below the anchor line, starting at the anchor column.
    Below,
    /// Below the anchor line, starting at the left margin.
    Block,
}

/// Stable identifier of a placed phantom within its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhantomId(pub(crate) u64);

impl PhantomId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A phantom description: anchor, content, layout and optional navigation callback.
#[derive(Clone)]
pub struct Phantom {
    /// Anchor region.
    pub region: Region,
    /// Markup content rendered by the host.
    pub content: String,
    /// Layout relative to the anchor.
    pub layout: PhantomLayout,
    /// Called when a link inside the phantom is activated.
    pub on_navigate: Option<NavigateCallback>,
}

impl Phantom {
    /// Create a phantom without a navigation callback.
    pub fn new(region: Region, content: impl Into<String>, layout: PhantomLayout) -> Self {
        Self {
            region,
            content: content.into(),
            layout,
            on_navigate: None,
        }
    }

    /// Attach a navigation callback.
    pub fn with_navigate(mut self, callback: NavigateCallback) -> Self {
        self.on_navigate = Some(callback);
        self
    }

    fn identity(&self) -> PhantomIdentity<'_> {
        PhantomIdentity {
            content: &self.content,
            layout: self.layout,
            callback: self
                .on_navigate
                .as_ref()
                .map(|cb| Arc::as_ptr(cb).cast::<()>() as usize),
        }
    }
}

impl fmt::Debug for Phantom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phantom")
            .field("region", &self.region)
            .field("content", &self.content)
            .field("layout", &self.layout)
            .field("on_navigate", &self.on_navigate.is_some())
            .finish()
    }
}

/// Identity used to match desired phantoms against placed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PhantomIdentity<'a> {
    content: &'a str,
    layout: PhantomLayout,
    callback: Option<usize>,
}

/// A phantom as placed on a view, with its current anchor.
#[derive(Debug, Clone)]
pub struct PlacedPhantom {
    /// Stable id.
    pub id: PhantomId,
    /// Key of the phantom group this phantom belongs to.
    pub key: String,
    /// The phantom, with `region` remapped to the current version.
    pub phantom: Phantom,
}

/// Changes applied by one [`PhantomSet::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhantomDiff {
    /// Newly placed phantoms.
    pub added: Vec<PhantomId>,
    /// Phantoms whose anchor was moved.
    pub moved: Vec<PhantomId>,
    /// Removed phantoms.
    pub removed: Vec<PhantomId>,
}

impl PhantomDiff {
    /// `true` if the update changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.moved.is_empty() && self.removed.is_empty()
    }
}

fn anchor_distance(a: &Region, b: &Region) -> usize {
    a.begin().abs_diff(b.begin()) + a.end().abs_diff(b.end())
}

/// Pair each desired phantom with at most one placed phantom of the same identity.
///
/// Candidate pairs are taken in order of anchor distance, then desired index, then placed id,
/// which makes duplicate identities resolve deterministically to the nearest anchor.
fn match_phantoms(desired: &[Phantom], placed: &[PlacedPhantom]) -> Vec<Option<usize>> {
    let mut by_identity: HashMap<PhantomIdentity<'_>, Vec<usize>> = HashMap::new();
    for (idx, p) in placed.iter().enumerate() {
        by_identity.entry(p.phantom.identity()).or_default().push(idx);
    }

    let mut candidates = Vec::new();
    for (d_idx, d) in desired.iter().enumerate() {
        if let Some(indices) = by_identity.get(&d.identity()) {
            for &p_idx in indices {
                let distance = anchor_distance(&d.region, &placed[p_idx].phantom.region);
                candidates.push((distance, d_idx, placed[p_idx].id, p_idx));
            }
        }
    }
    candidates.sort_unstable();

    let mut matches = vec![None; desired.len()];
    let mut taken = vec![false; placed.len()];
    for (_, d_idx, _, p_idx) in candidates {
        if matches[d_idx].is_none() && !taken[p_idx] {
            matches[d_idx] = Some(p_idx);
            taken[p_idx] = true;
        }
    }
    matches
}

/// The phantoms one owner keeps on one view under one key.
#[derive(Debug, Clone)]
pub struct PhantomSet {
    view: ViewId,
    key: String,
    ids: Vec<PhantomId>,
}

impl PhantomSet {
    /// Create an empty set for `view` and `key`.
    pub fn new(view: ViewId, key: impl Into<String>) -> Self {
        Self {
            view,
            key: key.into(),
            ids: Vec::new(),
        }
    }

    /// The view phantoms are placed on.
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// The phantom key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ids of the placed phantoms, in the order of the last desired list.
    pub fn ids(&self) -> &[PhantomId] {
        &self.ids
    }

    /// Reconcile the placed phantoms with `desired`.
    ///
    /// If the view no longer exists the update is dropped and an empty diff is returned.
    pub fn update(
        &mut self,
        workspace: &mut Workspace,
        desired: Vec<Phantom>,
    ) -> Result<PhantomDiff, WorkspaceError> {
        let Some((view, buffer)) = workspace.view_and_buffer_mut(self.view) else {
            tracing::debug!(view = ?self.view, key = %self.key, "view closed; phantom update dropped");
            self.ids.clear();
            return Ok(PhantomDiff::default());
        };

        view.sync(buffer)?;
        let placed = view.placed_phantoms(buffer, &self.key)?;
        let matches = match_phantoms(&desired, &placed);

        let mut diff = PhantomDiff::default();
        let mut kept = vec![false; placed.len()];
        let mut ids = Vec::with_capacity(desired.len());

        for (phantom, matched) in desired.into_iter().zip(matches) {
            match matched {
                Some(p_idx) => {
                    let current = &placed[p_idx];
                    kept[p_idx] = true;
                    let target = phantom.region.clamp_to(buffer.size());
                    if target != current.phantom.region {
                        view.move_phantom(current.id, target, buffer);
                        diff.moved.push(current.id);
                    }
                    ids.push(current.id);
                }
                None => {
                    let id = view.add_phantom(buffer, &self.key, phantom);
                    diff.added.push(id);
                    ids.push(id);
                }
            }
        }

        for (current, kept) in placed.iter().zip(kept) {
            if !kept {
                view.erase_phantom_by_id(current.id);
                diff.removed.push(current.id);
            }
        }

        tracing::debug!(
            view = ?self.view,
            key = %self.key,
            added = diff.added.len(),
            moved = diff.moved.len(),
            removed = diff.removed.len(),
            "phantoms reconciled"
        );
        self.ids = ids;
        Ok(diff)
    }
}
