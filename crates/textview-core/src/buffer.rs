//! Versioned buffer content and edit sessions.
//!
//! # Overview
//!
//! A [`Buffer`] is mutated only through an [`Edit`] token obtained from
//! [`Buffer::begin_edit`]. At most one session is open per buffer. Every mutation performed with
//! the token is recorded; closing the session with [`Buffer::end_edit`] commits the whole batch
//! as one version (`version + 1`) and returns the [`TextDelta`] it produced.
//!
//! Dropping an `Edit` without closing it commits the session at that moment, so an early `?`
//! return leaves the version, the mapper and the content in step. Only the [`TextDelta`] is lost.
//!
//! # Example
//!
//! ```rust
//! use textview_core::{Buffer, Region};
//!
//! let mut buffer = Buffer::new("hello world");
//! let before = buffer.stamp();
//!
//! let edit = buffer.begin_edit().unwrap();
//! buffer.insert(&edit, 5, "!").unwrap();
//! buffer.end_edit(edit).unwrap();
//!
//! assert_eq!(buffer.text(), "hello! world");
//! assert_eq!(buffer.change_count(), 1);
//! assert_eq!(
//!     buffer.transform_region_from(Region::new(6, 11), before).unwrap(),
//!     Region::new(7, 12),
//! );
//! ```

use crate::delta::{TextDelta, TextDeltaEdit};
use crate::error::ModelError;
use crate::mapper::{
    Bias, MutationLog, MutationRecord, PositionMapper, VersionStamp, map_point_through,
    map_region_through,
};
use crate::region::{Point, Region};
use crate::text::TextStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }

    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Capability to mutate one buffer for the duration of one edit session.
///
/// The token is neither `Clone` nor `Copy`; it is consumed by [`Buffer::end_edit`]. Dropping it
/// commits the session's mutations as one version.
#[derive(Debug)]
#[must_use = "an edit session stays open until the token is passed to `end_edit` or dropped"]
pub struct Edit {
    buffer: BufferId,
    serial: u64,
    pending: Arc<Mutex<PendingRecords>>,
    log: Arc<MutationLog>,
}

impl Edit {
    /// The buffer this token authorizes.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }
}

impl Drop for Edit {
    fn drop(&mut self) {
        let mut pending = lock_pending(&self.pending);
        if pending.closed {
            return;
        }
        pending.closed = true;
        let records = std::mem::take(&mut pending.records);
        if records.is_empty() {
            return;
        }
        let version = self.log.head() + 1;
        tracing::debug!(buffer = ?self.buffer, serial = self.serial, version, "dropped edit token committed its session");
        self.log.commit(version, records);
    }
}

/// Mutations of the open session, shared with its token.
#[derive(Debug, Default)]
struct PendingRecords {
    closed: bool,
    records: Vec<MutationRecord>,
}

fn lock_pending(pending: &Mutex<PendingRecords>) -> MutexGuard<'_, PendingRecords> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct OpenSession {
    serial: u64,
    pending: Arc<Mutex<PendingRecords>>,
    before_char_count: usize,
    edits: Vec<TextDeltaEdit>,
}

impl OpenSession {
    fn is_closed(&self) -> bool {
        lock_pending(&self.pending).closed
    }
}

/// Canonical text content plus its version and mutation history.
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    name: Option<String>,
    text: TextStore,
    log: Arc<MutationLog>,
    session: Option<OpenSession>,
    next_serial: u64,
}

impl Buffer {
    /// Create a buffer holding `text` at version 0.
    pub fn new(text: &str) -> Self {
        Self {
            id: BufferId::next(),
            name: None,
            text: TextStore::from_text(text),
            log: Arc::new(MutationLog::default()),
            session: None,
            next_serial: 0,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// This buffer's id.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// The file identity (path or uri) of the buffer, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the file identity of the buffer.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Length of the content in characters.
    pub fn size(&self) -> usize {
        self.text.len_chars()
    }

    /// Number of lines (an empty buffer has one line).
    pub fn line_count(&self) -> usize {
        self.text.line_count()
    }

    /// The full content.
    pub fn text(&self) -> String {
        self.text.text()
    }

    /// Text spanned by `region`, clamped to the buffer.
    pub fn substr(&self, region: Region) -> String {
        self.text.slice(&region)
    }

    /// Zero-based `(row, column)` of `point`, clamped to the buffer.
    pub fn rowcol(&self, point: Point) -> (usize, usize) {
        self.text.rowcol(point)
    }

    /// Offset of `(row, column)`, clamped to the buffer and the row.
    pub fn text_point(&self, row: usize, column: usize) -> Point {
        self.text.text_point(row, column)
    }

    /// Region of the line containing `point`, without its terminator.
    pub fn line(&self, point: Point) -> Region {
        let (row, _) = self.text.rowcol(point);
        self.text.line_bounds(row)
    }

    /// Regions of every line intersecting `region`, in order.
    pub fn lines(&self, region: Region) -> Vec<Region> {
        let (first, _) = self.text.rowcol(region.begin());
        let (last, _) = self.text.rowcol(region.end());
        (first..=last).map(|row| self.text.line_bounds(row)).collect()
    }

    /// Committed version: the number of sessions that changed the content.
    pub fn change_count(&self) -> u64 {
        self.log.head()
    }

    /// `true` while an edit session is open and its token is still alive.
    pub fn is_session_open(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Capture the current position in the mutation history.
    ///
    /// Inside an open session the stamp also records how many mutations the session has applied.
    pub fn stamp(&self) -> VersionStamp {
        let sub_sequence = self
            .session
            .as_ref()
            .map_or(0, |s| lock_pending(&s.pending).records.len());
        VersionStamp::new(self.id, self.change_count(), sub_sequence)
    }

    /// A thread-safe handle for remapping across committed versions.
    pub fn mapper(&self) -> PositionMapper {
        PositionMapper::new(self.id, Arc::clone(&self.log))
    }

    /// Number of mutations in the committed history.
    pub fn mutation_count(&self) -> usize {
        self.log.len()
    }

    /// Open an edit session.
    pub fn begin_edit(&mut self) -> Result<Edit, ModelError> {
        if self.session.as_ref().is_some_and(OpenSession::is_closed) {
            self.session = None;
        }
        if self.session.is_some() {
            return Err(ModelError::SessionAlreadyOpen(self.id));
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let pending = Arc::new(Mutex::new(PendingRecords::default()));
        self.session = Some(OpenSession {
            serial,
            pending: Arc::clone(&pending),
            before_char_count: self.size(),
            edits: Vec::new(),
        });
        tracing::debug!(buffer = ?self.id, serial, version = self.change_count(), "edit session opened");

        Ok(Edit {
            buffer: self.id,
            serial,
            pending,
            log: Arc::clone(&self.log),
        })
    }

    /// Close the session authorized by `edit`, committing its mutations as one version.
    ///
    /// A session that changed nothing leaves the version unchanged.
    pub fn end_edit(&mut self, edit: Edit) -> Result<TextDelta, ModelError> {
        self.check_token(&edit)?;
        let delta = self.commit_session();
        drop(edit);
        Ok(delta)
    }

    /// Run `f` inside a fresh session, closing it on every exit path.
    pub fn edit<T, E, F>(&mut self, f: F) -> Result<(T, TextDelta), E>
    where
        F: FnOnce(&mut Buffer, &Edit) -> Result<T, E>,
        E: From<ModelError>,
    {
        let edit = self.begin_edit()?;
        let result = f(self, &edit);
        let delta = self.end_edit(edit)?;
        result.map(|value| (value, delta))
    }

    /// Insert `text` at `point`. Returns the number of characters inserted.
    pub fn insert(&mut self, edit: &Edit, point: Point, text: &str) -> Result<usize, ModelError> {
        self.check_token(edit)?;
        self.check_point(point)?;
        Ok(self.apply(point, 0, text))
    }

    /// Erase the span of `region`.
    pub fn erase(&mut self, edit: &Edit, region: Region) -> Result<(), ModelError> {
        self.check_token(edit)?;
        self.check_point(region.end())?;
        self.apply(region.begin(), region.size(), "");
        Ok(())
    }

    /// Replace the span of `region` with `text`. Returns the number of characters inserted.
    pub fn replace(&mut self, edit: &Edit, region: Region, text: &str) -> Result<usize, ModelError> {
        self.check_token(edit)?;
        self.check_point(region.end())?;
        Ok(self.apply(region.begin(), region.size(), text))
    }

    /// Project `region`, recorded at `stamp`, onto the current content.
    ///
    /// Mutations of a session that is still open are included.
    pub fn transform_region_from(
        &self,
        region: Region,
        stamp: VersionStamp,
    ) -> Result<Region, ModelError> {
        self.with_records_since(stamp, |committed, pending| {
            map_region_through(map_region_through(region, committed), pending)
        })
    }

    /// Project a single point, recorded at `stamp`, onto the current content.
    pub fn transform_point_from(
        &self,
        point: Point,
        bias: Bias,
        stamp: VersionStamp,
    ) -> Result<Point, ModelError> {
        self.with_records_since(stamp, |committed, pending| {
            map_point_through(map_point_through(point, bias, committed), bias, pending)
        })
    }

    fn with_records_since<R>(
        &self,
        stamp: VersionStamp,
        f: impl FnOnce(&[MutationRecord], &[MutationRecord]) -> R,
    ) -> Result<R, ModelError> {
        let current = self.stamp();
        let version = current.version();
        let invalid = || ModelError::InvalidVersionStamp {
            buffer: self.id,
            stamp_version: stamp.version(),
            current_version: version,
        };
        if stamp.buffer() != self.id || stamp.partial_cmp(&current).is_none_or(|o| o.is_gt()) {
            return Err(invalid());
        }

        let guard = self.session.as_ref().map(|s| lock_pending(&s.pending));
        let pending = guard.as_ref().map_or(&[][..], |g| &g.records[..]);
        if stamp.version() == version {
            return Ok(f(&[], &pending[stamp.sub_sequence()..]));
        }
        self.log
            .with_range((stamp.version(), stamp.sub_sequence()), version, |committed| {
                f(committed, pending)
            })
            .ok_or_else(invalid)
    }

    fn check_token(&self, edit: &Edit) -> Result<(), ModelError> {
        let reason = if edit.buffer != self.id {
            Some("token belongs to another buffer")
        } else {
            match &self.session {
                None => Some("no edit session is open"),
                Some(session) if session.is_closed() => Some("no edit session is open"),
                Some(session) if session.serial != edit.serial => {
                    Some("token belongs to a closed session")
                }
                Some(_) => None,
            }
        };
        match reason {
            Some(reason) => {
                tracing::debug!(buffer = ?self.id, reason, "rejected edit token");
                Err(ModelError::InvalidEditState {
                    buffer: self.id,
                    reason,
                })
            }
            None => Ok(()),
        }
    }

    fn check_point(&self, point: Point) -> Result<(), ModelError> {
        let len = self.size();
        if point > len {
            return Err(ModelError::OutOfRange { point, len });
        }
        Ok(())
    }

    /// Apply a validated mutation to the content and record it in the open session.
    fn apply(&mut self, at: Point, removed_len: usize, text: &str) -> usize {
        if removed_len == 0 && text.is_empty() {
            return 0;
        }
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let deleted_text = self.text.slice(&Region::new(at, at + removed_len));
        self.text.remove(at, at + removed_len);
        self.text.insert(at, text);

        let record = MutationRecord::new(at, removed_len, text.to_string(), self.log.head() + 1);
        let inserted_len = record.inserted_len();
        tracing::trace!(buffer = ?self.id, at, removed_len, inserted_len, "buffer mutated");
        lock_pending(&session.pending).records.push(record);
        session.edits.push(TextDeltaEdit {
            start: at,
            deleted_text,
            inserted_text: text.to_string(),
        });
        inserted_len
    }

    fn commit_session(&mut self) -> TextDelta {
        let Some(session) = self.session.take() else {
            return TextDelta {
                before_char_count: self.size(),
                after_char_count: self.size(),
                edits: Vec::new(),
                version: self.change_count(),
            };
        };

        let records = {
            let mut pending = lock_pending(&session.pending);
            pending.closed = true;
            std::mem::take(&mut pending.records)
        };
        if !records.is_empty() {
            self.log.commit(self.log.head() + 1, records);
        }
        let version = self.change_count();
        tracing::debug!(
            buffer = ?self.id,
            serial = session.serial,
            version,
            edits = session.edits.len(),
            "edit session committed"
        );

        TextDelta {
            before_char_count: session.before_char_count,
            after_char_count: self.size(),
            edits: session.edits,
            version,
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_commits_one_version() {
        let mut buffer = Buffer::new("abc");
        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, 3, "def").unwrap();
        buffer.erase(&edit, Region::new(0, 1)).unwrap();
        buffer.replace(&edit, Region::new(0, 2), "X").unwrap();
        let delta = buffer.end_edit(edit).unwrap();

        assert_eq!(buffer.text(), "Xdef");
        assert_eq!(buffer.change_count(), 1);
        assert_eq!(buffer.mutation_count(), 3);
        assert_eq!(delta.edits.len(), 3);
        assert_eq!(delta.before_char_count, 3);
        assert_eq!(delta.after_char_count, 4);
        assert_eq!(delta.edits[2].deleted_text, "bc");
        assert_eq!(delta.version, 1);
    }

    #[test]
    fn test_empty_session_keeps_version() {
        let mut buffer = Buffer::new("abc");
        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, 1, "").unwrap();
        let delta = buffer.end_edit(edit).unwrap();
        assert!(delta.is_empty());
        assert_eq!(buffer.change_count(), 0);
    }

    #[test]
    fn test_nested_session_rejected() {
        let mut buffer = Buffer::new("abc");
        let edit = buffer.begin_edit().unwrap();
        assert_eq!(
            buffer.begin_edit().unwrap_err(),
            ModelError::SessionAlreadyOpen(buffer.id())
        );
        buffer.end_edit(edit).unwrap();
        assert!(buffer.begin_edit().is_ok());
    }

    #[test]
    fn test_stale_token_rejected() {
        let mut buffer = Buffer::new("abc");
        let first = buffer.begin_edit().unwrap();
        let serial = first.serial;
        buffer.end_edit(first).unwrap();

        let _second = buffer.begin_edit().unwrap();
        let forged = Edit {
            buffer: buffer.id(),
            serial,
            pending: Arc::default(),
            log: Arc::clone(&buffer.log),
        };
        let err = buffer.insert(&forged, 0, "x").unwrap_err();
        assert!(matches!(err, ModelError::InvalidEditState { .. }));
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_out_of_range_mutation_fails() {
        let mut buffer = Buffer::new("abc");
        let edit = buffer.begin_edit().unwrap();
        assert_eq!(
            buffer.insert(&edit, 4, "x").unwrap_err(),
            ModelError::OutOfRange { point: 4, len: 3 }
        );
        assert!(buffer.erase(&edit, Region::new(2, 9)).is_err());
        buffer.end_edit(edit).unwrap();
        assert_eq!(buffer.text(), "abc");
        assert_eq!(buffer.change_count(), 0);
    }

    fn prefix_then_fail(buffer: &mut Buffer) -> Result<(), ModelError> {
        let edit = buffer.begin_edit()?;
        buffer.insert(&edit, 0, "x")?;
        buffer.insert(&edit, 99, "y")?;
        buffer.end_edit(edit)?;
        Ok(())
    }

    #[test]
    fn test_dropped_token_commits_immediately() {
        let mut buffer = Buffer::new("abc");
        let before = buffer.stamp();
        let mapper = buffer.mapper();

        let err = prefix_then_fail(&mut buffer).unwrap_err();
        assert_eq!(err, ModelError::OutOfRange { point: 99, len: 4 });

        assert_eq!(buffer.text(), "xabc");
        assert!(!buffer.is_session_open());
        assert_eq!(buffer.change_count(), 1);
        assert_eq!(buffer.mutation_count(), 1);
        assert_eq!(mapper.head_version(), 1);
        assert_eq!(
            mapper.transform_to_head(Region::new(1, 3), before).unwrap(),
            Region::new(2, 4)
        );

        let after = buffer.stamp();
        assert_eq!((after.version(), after.sub_sequence()), (1, 0));
        assert_eq!(
            mapper.transform_to_head(Region::new(1, 3), after).unwrap(),
            Region::new(1, 3)
        );

        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, 4, "!").unwrap();
        assert_eq!(buffer.end_edit(edit).unwrap().version, 2);
    }

    #[test]
    fn test_dropped_empty_session_keeps_version() {
        let mut buffer = Buffer::new("abc");
        drop(buffer.begin_edit().unwrap());
        assert_eq!(buffer.change_count(), 0);
        assert!(buffer.begin_edit().is_ok());
    }

    #[test]
    fn test_mid_session_stamp() {
        let mut buffer = Buffer::new("0123456789");
        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, 0, "ab").unwrap();
        let mid = buffer.stamp();
        assert_eq!(mid.sub_sequence(), 1);
        let region = Region::new(4, 6); // "23"
        buffer.insert(&edit, 0, "c").unwrap();
        assert_eq!(buffer.transform_region_from(region, mid).unwrap(), Region::new(5, 7));
        buffer.end_edit(edit).unwrap();

        assert_eq!(buffer.transform_region_from(region, mid).unwrap(), Region::new(5, 7));
        assert_eq!(buffer.substr(Region::new(5, 7)), "23");
    }

    #[test]
    fn test_foreign_stamp_rejected() {
        let mut buffer = Buffer::new("abc");
        buffer
            .edit(|b, e| b.insert(e, 0, "x").map(|_| ()))
            .unwrap();
        let stamp = buffer.stamp();
        let other = Buffer::new("abc");
        assert!(matches!(
            other.transform_region_from(Region::new(0, 1), stamp),
            Err(ModelError::InvalidVersionStamp { .. })
        ));
    }

    #[test]
    fn test_mapper_rejects_target_before_stamp() {
        let mut buffer = Buffer::new("abc");
        buffer
            .edit(|b, e| b.insert(e, 0, "x").map(|_| ()))
            .unwrap();
        let mapper = buffer.mapper();
        let stamp = mapper.stamp_at(1).unwrap();
        assert!(matches!(
            mapper.transform_region(Region::new(0, 1), stamp, 0),
            Err(ModelError::InvalidVersionStamp { .. })
        ));
        assert!(mapper.stamp_at(2).is_err());
    }

    #[test]
    fn test_text_queries() {
        let buffer = Buffer::new("fn main() {\n    x\n}\n");
        assert_eq!(buffer.rowcol(16), (1, 4));
        assert_eq!(buffer.text_point(1, 4), 16);
        assert_eq!(buffer.line(14), Region::new(12, 17));
        assert_eq!(
            buffer.lines(Region::new(3, 13)),
            vec![Region::new(0, 11), Region::new(12, 17)]
        );
        assert_eq!(buffer.substr(Region::new(3, 7)), "main");
    }
}
