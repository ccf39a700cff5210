//! Ordered, merging region set.
//!
//! A [`Selection`] holds the cursors/highlighted spans of one view. After every mutation the
//! members are sorted by `(begin, end)` and pairwise non-intersecting in the sense of
//! [`Region::intersects`]: touching regions stay separate, overlapping regions are merged.

use crate::region::{Point, Region};
use serde::{Deserialize, Serialize};

/// A sorted set of non-intersecting [`Region`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Region>", into = "Vec<Region>")]
pub struct Selection {
    regions: Vec<Region>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// `true` if the selection has no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region at `index` in sorted order.
    pub fn get(&self, index: usize) -> Option<Region> {
        self.regions.get(index).copied()
    }

    /// Iterate regions in sorted order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Region> + '_ {
        self.regions.iter()
    }

    /// Regions as a sorted slice.
    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }

    /// Remove every region.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Index of the first member whose end is not before `point`.
    ///
    /// Members are disjoint and sorted by begin, so their ends are non-decreasing too.
    fn first_ending_at_or_after(&self, point: Point) -> usize {
        self.regions.partition_point(|m| m.end() < point)
    }

    /// Half-open index window of members that may intersect `region`.
    fn candidates(&self, region: &Region) -> (usize, usize) {
        let lo = self.first_ending_at_or_after(region.begin());
        let hi = lo + self.regions[lo..].partition_point(|m| m.begin() <= region.end());
        (lo, hi)
    }

    /// Add `region`, merging it with every member it intersects.
    ///
    /// If nothing intersects, `region` is inserted as given. Otherwise the merged result is the
    /// forward cover of `region` and all absorbed members, carrying `region`'s caret hint.
    pub fn add(&mut self, region: Region) {
        let mut merged = region;
        let mut absorbed = false;

        loop {
            let (lo, hi) = self.candidates(&merged);
            let first = (lo..hi).find(|&i| self.regions[i].intersects(&merged));
            let Some(first) = first else {
                break;
            };
            let last = (first..hi)
                .rev()
                .find(|&i| self.regions[i].intersects(&merged))
                .unwrap_or(first);

            for member in self.regions.drain(first..=last) {
                merged = merged.cover(&member);
            }
            absorbed = true;
        }

        let result = if absorbed {
            merged.with_xpos(region.xpos)
        } else {
            region
        };
        let at = self.regions.partition_point(|m| *m < result);
        self.regions.insert(at, result);
    }

    /// Add every region yielded by `regions`. The final set does not depend on the order.
    pub fn add_all<I>(&mut self, regions: I)
    where
        I: IntoIterator<Item = Region>,
    {
        for region in regions {
            self.add(region);
        }
    }

    /// Remove the span of `region` from every member it intersects.
    ///
    /// Members fully covered disappear, members overlapping one side are trimmed, and a member
    /// strictly containing `region` is split in two. Pieces keep the member's direction. An empty
    /// `region` only removes a caret at the same point.
    pub fn subtract(&mut self, region: Region) {
        let (lo, hi) = self.candidates(&region);
        if lo == hi {
            return;
        }

        let mut replacement = Vec::with_capacity(hi - lo + 1);
        for member in self.regions.drain(lo..hi) {
            if !member.intersects(&region) || (region.is_empty() && !member.is_empty()) {
                replacement.push(member);
                continue;
            }
            if member.begin() < region.begin() {
                replacement.push(piece_of(&member, member.begin(), region.begin()));
            }
            if region.end() < member.end() {
                replacement.push(piece_of(&member, region.end(), member.end()));
            }
        }

        self.regions.splice(lo..lo, replacement);
    }

    /// `true` if `region` is fully covered by the union of the members.
    ///
    /// Adjacent members jointly cover a region spanning their shared boundary.
    pub fn contains(&self, region: Region) -> bool {
        if region.is_empty() {
            return self.contains_point(region.a);
        }

        let mut covered_to = region.begin();
        let start = self.regions.partition_point(|m| m.end() <= covered_to);
        for member in &self.regions[start..] {
            if member.begin() > covered_to {
                return false;
            }
            covered_to = covered_to.max(member.end());
            if covered_to >= region.end() {
                return true;
            }
        }
        false
    }

    /// `true` if some member contains `point` (boundaries inclusive).
    pub fn contains_point(&self, point: Point) -> bool {
        let idx = self.first_ending_at_or_after(point);
        self.regions.get(idx).is_some_and(|m| m.begin() <= point)
    }

    #[cfg(test)]
    pub(crate) fn check_invariant(&self) -> bool {
        self.regions
            .windows(2)
            .all(|w| w[0] <= w[1] && !w[0].intersects(&w[1]))
    }
}

fn piece_of(member: &Region, begin: Point, end: Point) -> Region {
    if member.is_reversed() {
        Region::new(end, begin)
    } else {
        Region::new(begin, end)
    }
}

impl From<Vec<Region>> for Selection {
    fn from(regions: Vec<Region>) -> Self {
        regions.into_iter().collect()
    }
}

impl From<Selection> for Vec<Region> {
    fn from(selection: Selection) -> Self {
        selection.regions
    }
}

impl FromIterator<Region> for Selection {
    fn from_iter<T: IntoIterator<Item = Region>>(iter: T) -> Self {
        let mut selection = Selection::new();
        selection.add_all(iter);
        selection
    }
}

impl Extend<Region> for Selection {
    fn extend<T: IntoIterator<Item = Region>>(&mut self, iter: T) {
        self.add_all(iter);
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn regions(sel: &Selection) -> Vec<(Point, Point)> {
        sel.iter().map(Region::to_tuple).collect()
    }

    fn random_region(rng: &mut StdRng) -> Region {
        let a = rng.gen_range(0..60);
        let len = if rng.gen_bool(0.2) { 0 } else { rng.gen_range(0..8) };
        if rng.gen_bool(0.5) {
            Region::new(a, a + len)
        } else {
            Region::new(a + len, a)
        }
    }

    #[test]
    fn test_add_merges_overlapping_members() {
        let mut sel = Selection::new();
        sel.add(Region::new(0, 3));
        sel.add(Region::new(5, 8));
        sel.add(Region::new(2, 6));
        assert_eq!(regions(&sel), vec![(0, 8)]);
    }

    #[test]
    fn test_add_keeps_adjacent_members_separate() {
        let mut sel = Selection::new();
        sel.add(Region::new(3, 5));
        sel.add(Region::new(0, 3));
        sel.add(Region::caret(5));
        assert_eq!(regions(&sel), vec![(0, 3), (3, 5), (5, 5)]);
    }

    #[test]
    fn test_add_without_overlap_keeps_direction() {
        let mut sel = Selection::new();
        sel.add(Region::new(9, 4));
        assert_eq!(regions(&sel), vec![(9, 4)]);
    }

    #[test]
    fn test_add_caret_inside_member_is_absorbed() {
        let mut sel = Selection::new();
        sel.add(Region::new(2, 8));
        sel.add(Region::caret(4).with_xpos(Some(11)));
        assert_eq!(regions(&sel), vec![(2, 8)]);
        assert_eq!(sel.get(0).and_then(|r| r.xpos), Some(11));
    }

    #[test]
    fn test_duplicate_carets_collapse() {
        let sel: Selection = [Region::caret(4), Region::caret(4)].into_iter().collect();
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_merge_most_recent_xpos_wins() {
        let mut sel = Selection::new();
        sel.add(Region::new(0, 4).with_xpos(Some(1)));
        sel.add(Region::new(3, 6).with_xpos(Some(2)));
        assert_eq!(sel.get(0).and_then(|r| r.xpos), Some(2));
    }

    #[test]
    fn test_subtract_splits_interior() {
        let mut sel = Selection::new();
        sel.add(Region::new(0, 8));
        sel.subtract(Region::new(2, 6));
        assert_eq!(regions(&sel), vec![(0, 2), (6, 8)]);
    }

    #[test]
    fn test_subtract_trims_and_removes() {
        let mut sel: Selection = vec![Region::new(0, 4), Region::new(6, 9), Region::new(12, 10)]
            .into_iter()
            .collect();
        sel.subtract(Region::new(3, 11));
        assert_eq!(regions(&sel), vec![(0, 3), (12, 11)]);
        assert!(sel.check_invariant());
    }

    #[test]
    fn test_subtract_empty_region_removes_only_matching_caret() {
        let mut sel: Selection = vec![Region::new(0, 4), Region::caret(7)].into_iter().collect();
        sel.subtract(Region::caret(2));
        assert_eq!(regions(&sel), vec![(0, 4), (7, 7)]);
        sel.subtract(Region::caret(7));
        assert_eq!(regions(&sel), vec![(0, 4)]);
    }

    #[test]
    fn test_contains_requires_full_coverage() {
        let sel: Selection = vec![Region::new(0, 3), Region::new(3, 6), Region::new(8, 10)]
            .into_iter()
            .collect();
        assert!(sel.contains(Region::new(1, 5)));
        assert!(sel.contains(Region::new(6, 0)));
        assert!(!sel.contains(Region::new(5, 9)));
        assert!(sel.contains(Region::caret(6)));
        assert!(!sel.contains(Region::caret(7)));
        assert!(sel.contains_point(10));
        assert!(!sel.contains_point(7));
    }

    #[test]
    fn test_clear() {
        let mut sel: Selection = vec![Region::new(0, 3)].into_iter().collect();
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn test_random_adds_keep_invariant() {
        let mut rng = StdRng::seed_from_u64(0x5e1ec7);
        for _ in 0..200 {
            let mut sel = Selection::new();
            for _ in 0..rng.gen_range(1..30) {
                sel.add(random_region(&mut rng));
                assert!(sel.check_invariant(), "{:?}", sel);
            }
            for _ in 0..3 {
                sel.subtract(random_region(&mut rng));
                assert!(sel.check_invariant(), "{:?}", sel);
            }
        }
    }

    #[test]
    fn test_add_is_confluent() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut input: Vec<Region> =
                (0..rng.gen_range(1..20)).map(|_| random_region(&mut rng)).collect();
            let expected: Selection = input.iter().copied().collect();
            for _ in 0..5 {
                input.shuffle(&mut rng);
                let shuffled: Selection = input.iter().copied().collect();
                assert_eq!(regions(&shuffled), regions(&expected));
            }
        }
    }

    #[test]
    fn test_serde_normalizes() {
        let sel: Selection = serde_json::from_str(r#"[{"a":5,"b":8},{"a":0,"b":6}]"#).unwrap();
        assert_eq!(regions(&sel), vec![(0, 8)]);
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"[{"a":0,"b":8}]"#);
    }
}
