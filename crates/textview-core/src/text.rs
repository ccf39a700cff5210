//! Rope-backed buffer content.
//!
//! All offsets are character offsets (Unicode scalar values). Query methods clamp out-of-range
//! input to the document; mutation methods expect pre-validated offsets.

use crate::region::{Point, Region};
use ropey::Rope;

/// Text content with O(log N) line and offset access.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextStore {
    rope: Rope,
}

impl TextStore {
    pub(crate) fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    pub(crate) fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub(crate) fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub(crate) fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text spanned by `region`, clamped to the document.
    pub(crate) fn slice(&self, region: &Region) -> String {
        let len = self.rope.len_chars();
        let begin = region.begin().min(len);
        let end = region.end().min(len);
        self.rope.slice(begin..end).to_string()
    }

    /// `(row, column)` of `point`, clamped to the document end.
    pub(crate) fn rowcol(&self, point: Point) -> (usize, usize) {
        let point = point.min(self.rope.len_chars());
        let row = self.rope.char_to_line(point);
        (row, point - self.rope.line_to_char(row))
    }

    /// Offset of `(row, column)`; rows past the end map to the document end and columns past the
    /// end of the row map to the row end.
    pub(crate) fn text_point(&self, row: usize, column: usize) -> Point {
        if row >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line = self.line_bounds(row);
        line.begin() + column.min(line.size())
    }

    /// Region of row `row`, excluding its line terminator.
    pub(crate) fn line_bounds(&self, row: usize) -> Region {
        let row = row.min(self.rope.len_lines().saturating_sub(1));
        let start = self.rope.line_to_char(row);
        let line = self.rope.line(row);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && line.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        Region::new(start, start + len)
    }

    pub(crate) fn insert(&mut self, point: Point, text: &str) {
        self.rope.insert(point, text);
    }

    pub(crate) fn remove(&mut self, begin: Point, end: Point) {
        if begin < end {
            self.rope.remove(begin..end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_has_one_line() {
        let store = TextStore::default();
        assert_eq!(store.line_count(), 1);
        assert_eq!(store.len_chars(), 0);
    }

    #[test]
    fn test_rowcol_and_text_point_round_trip() {
        let store = TextStore::from_text("ab\n世界x\n");
        assert_eq!(store.rowcol(4), (1, 1));
        assert_eq!(store.text_point(1, 1), 4);
        assert_eq!(store.text_point(1, 99), 6);
        assert_eq!(store.text_point(9, 0), store.len_chars());
        assert_eq!(store.rowcol(999), (2, 0));
    }

    #[test]
    fn test_line_bounds_strip_terminators() {
        let store = TextStore::from_text("one\r\ntwo\nthree");
        assert_eq!(store.line_bounds(0), Region::new(0, 3));
        assert_eq!(store.line_bounds(1), Region::new(5, 8));
        assert_eq!(store.line_bounds(2), Region::new(9, 14));
    }

    #[test]
    fn test_slice_clamps() {
        let store = TextStore::from_text("hello");
        assert_eq!(store.slice(&Region::new(3, 99)), "lo");
        assert_eq!(store.slice(&Region::new(4, 1)), "ell");
    }
}
