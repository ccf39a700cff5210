//! Directed intervals over character offsets.
//!
//! A [`Region`] is the value type shared by cursors, selections, named region collections and
//! phantom anchors. It is a pair of [`Point`]s (`a` is the anchor, `b` the active end) plus an
//! optional horizontal caret hint used when moving vertically across lines of different length.
//!
//! All operations here are pure and total: they never fail and never look at buffer contents.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A character offset (Unicode scalar values) into a buffer's content.
pub type Point = usize;

/// A directed interval `[begin, end)` over [`Point`]s.
///
/// `a` and `b` may be in either order: `a > b` describes a backward (reversed) region. Equality
/// and hashing consider `a` and `b` only; `xpos` is a presentation hint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Region {
    /// Anchor point.
    pub a: Point,
    /// Active point (the caret).
    pub b: Point,
    /// Preferred horizontal caret position, in cells, if one has been established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpos: Option<usize>,
}

impl Region {
    /// Create a region from anchor `a` to active point `b`.
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b, xpos: None }
    }

    /// Create an empty region (a caret) at `point`.
    pub const fn caret(point: Point) -> Self {
        Self::new(point, point)
    }

    /// Return a copy carrying the given horizontal caret hint.
    pub fn with_xpos(mut self, xpos: Option<usize>) -> Self {
        self.xpos = xpos;
        self
    }

    /// Smallest point of the region.
    pub fn begin(&self) -> Point {
        self.a.min(self.b)
    }

    /// Largest point of the region.
    pub fn end(&self) -> Point {
        self.a.max(self.b)
    }

    /// Number of characters spanned.
    pub fn size(&self) -> usize {
        self.end() - self.begin()
    }

    /// `true` if `a == b`.
    pub fn is_empty(&self) -> bool {
        self.a == self.b
    }

    /// `true` if the region is backward (`a > b`).
    pub fn is_reversed(&self) -> bool {
        self.a > self.b
    }

    /// `true` if `point` lies within `[begin, end]` (both boundaries inclusive).
    pub fn contains(&self, point: Point) -> bool {
        self.begin() <= point && point <= self.end()
    }

    /// `true` if `other` lies entirely within `[begin, end]`.
    pub fn contains_region(&self, other: &Region) -> bool {
        self.begin() <= other.begin() && other.end() <= self.end()
    }

    /// Smallest forward region spanning both `self` and `other`.
    pub fn cover(&self, other: &Region) -> Region {
        Region::new(self.begin().min(other.begin()), self.end().max(other.end()))
    }

    /// Overlap of the two regions.
    ///
    /// When the interiors do not overlap the result is an empty region at the boundary between
    /// them (`min(max(begins), min(ends))`); this is never an error.
    pub fn intersection(&self, other: &Region) -> Region {
        let lo = self.begin().max(other.begin());
        let hi = self.end().min(other.end());
        if lo < hi {
            Region::new(lo, hi)
        } else {
            Region::caret(lo.min(hi))
        }
    }

    /// `true` if the two regions overlap.
    ///
    /// Regions that only touch at a boundary do not intersect, with two exceptions for carets: two
    /// empty regions at the same point intersect, and an empty region strictly inside a non-empty
    /// one intersects it.
    pub fn intersects(&self, other: &Region) -> bool {
        let (lb, le) = (self.begin(), self.end());
        let (rb, re) = (other.begin(), other.end());

        if lb == rb && le == re {
            return true;
        }
        if lb < le && rb < re {
            return lb.max(rb) < le.min(re);
        }
        // At least one side is a caret.
        if lb == le {
            rb < lb && lb < re
        } else {
            lb < rb && rb < le
        }
    }

    /// `(a, b)` as a tuple.
    pub fn to_tuple(&self) -> (Point, Point) {
        (self.a, self.b)
    }

    /// Forward copy of this region (`a = begin`, `b = end`), keeping the caret hint.
    pub fn normalized(&self) -> Region {
        Region::new(self.begin(), self.end()).with_xpos(self.xpos)
    }

    /// Clamp both points to `[0, max]`.
    pub fn clamp_to(&self, max: Point) -> Region {
        Region::new(self.a.min(max), self.b.min(max)).with_xpos(self.xpos)
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && self.b == other.b
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.a.hash(state);
        self.b.hash(state);
    }
}

impl Ord for Region {
    /// Orders by `begin`, then `end`, then `a`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.begin()
            .cmp(&other.begin())
            .then_with(|| self.end().cmp(&other.end()))
            .then_with(|| self.a.cmp(&other.a))
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(Point, Point)> for Region {
    fn from((a, b): (Point, Point)) -> Self {
        Region::new(a, b)
    }
}

impl From<Point> for Region {
    fn from(point: Point) -> Self {
        Region::caret(point)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}
