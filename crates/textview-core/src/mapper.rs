//! Version stamps and position remapping.
//!
//! Every committed edit session appends its mutations to an append-only [`MutationLog`]. A region
//! recorded together with a [`VersionStamp`] can later be projected onto a newer version by
//! replaying the mutations committed since the stamp, one at a time:
//!
//! - a boundary before the edit is unchanged,
//! - a boundary after the edited span shifts by `inserted_len - removed_len`,
//! - a boundary inside `[at, at + removed_len]` collapses onto the edit: a start boundary maps to
//!   `at`, an end boundary to `at + inserted_len`.
//!
//! The log never rewrites entries, so a [`PositionMapper`] handle may remap already-committed
//! version ranges from other threads while the owning buffer keeps appending.

use crate::buffer::BufferId;
use crate::error::ModelError;
use crate::region::{Point, Region};
use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};

/// An opaque marker of a buffer's position in its mutation history.
///
/// Stamps are only comparable against stamps of the same buffer; `partial_cmp` returns `None`
/// across buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionStamp {
    buffer: BufferId,
    version: u64,
    sub_sequence: usize,
}

impl VersionStamp {
    pub(crate) fn new(buffer: BufferId, version: u64, sub_sequence: usize) -> Self {
        Self {
            buffer,
            version,
            sub_sequence,
        }
    }

    /// The buffer this stamp was captured on.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Committed version at capture time.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Mutations already applied by the session that was open at capture time (0 if none was).
    pub fn sub_sequence(&self) -> usize {
        self.sub_sequence
    }

    fn position(&self) -> (u64, usize) {
        (self.version, self.sub_sequence)
    }
}

impl PartialOrd for VersionStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.buffer == other.buffer).then(|| self.position().cmp(&other.position()))
    }
}

/// One applied mutation: `removed_len` characters at `at` replaced by `inserted_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    at: Point,
    removed_len: usize,
    inserted_text: String,
    inserted_len: usize,
    version_after: u64,
}

impl MutationRecord {
    pub(crate) fn new(at: Point, removed_len: usize, inserted_text: String, version_after: u64) -> Self {
        let inserted_len = inserted_text.chars().count();
        Self {
            at,
            removed_len,
            inserted_text,
            inserted_len,
            version_after,
        }
    }

    /// Pre-edit offset of the mutation.
    pub fn at(&self) -> Point {
        self.at
    }

    /// Number of characters removed at `at`.
    pub fn removed_len(&self) -> usize {
        self.removed_len
    }

    /// Text inserted at `at`.
    pub fn inserted_text(&self) -> &str {
        &self.inserted_text
    }

    /// Length of the inserted text in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_len
    }

    /// Version produced by the session this mutation belongs to.
    pub fn version_after(&self) -> u64 {
        self.version_after
    }

    /// Map a single point across this mutation.
    pub fn map_point(&self, point: Point, bias: Bias) -> Point {
        let edit_end = self.at + self.removed_len;
        if point < self.at {
            point
        } else if point > edit_end {
            point - self.removed_len + self.inserted_len
        } else {
            match bias {
                Bias::Start => self.at,
                Bias::End => self.at + self.inserted_len,
            }
        }
    }

    /// Map both boundaries of `region` across this mutation.
    ///
    /// The lower point takes the start role and the higher point the end role; for an empty
    /// region `a` is the start and `b` the end.
    pub fn map_region(&self, region: &Region) -> Region {
        let (bias_a, bias_b) = if region.a <= region.b {
            (Bias::Start, Bias::End)
        } else {
            (Bias::End, Bias::Start)
        };
        Region::new(self.map_point(region.a, bias_a), self.map_point(region.b, bias_b))
            .with_xpos(region.xpos)
    }
}

/// Which side of an edit a boundary falling inside it collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Collapse to the start of the edit.
    Start,
    /// Collapse to the end of the inserted text.
    End,
}

/// Replay `records` in order over `region`.
pub(crate) fn map_region_through<'a, I>(region: Region, records: I) -> Region
where
    I: IntoIterator<Item = &'a MutationRecord>,
{
    records
        .into_iter()
        .fold(region, |region, record| record.map_region(&region))
}

/// Replay `records` in order over a single point.
pub(crate) fn map_point_through<'a, I>(point: Point, bias: Bias, records: I) -> Point
where
    I: IntoIterator<Item = &'a MutationRecord>,
{
    records
        .into_iter()
        .fold(point, |point, record| record.map_point(point, bias))
}

#[derive(Debug, Default)]
struct LogInner {
    records: Vec<MutationRecord>,
    head: u64,
}

/// Append-only history of committed mutations, ordered by version.
#[derive(Debug, Default)]
pub(crate) struct MutationLog {
    inner: RwLock<LogInner>,
}

impl MutationLog {
    pub(crate) fn head(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).head
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// Append the mutations of one committed session.
    pub(crate) fn commit(&self, version: u64, records: Vec<MutationRecord>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(version > inner.head);
        debug_assert!(records.iter().all(|r| r.version_after == version));
        inner.records.extend(records);
        inner.head = version;
    }

    /// Run `f` over the committed records strictly after `from` and up to version `to`.
    ///
    /// Returns `None` if `from` names more sub-sequence mutations than version
    /// `from.version + 1` has.
    pub(crate) fn with_range<R>(
        &self,
        from: (u64, usize),
        to: u64,
        f: impl FnOnce(&[MutationRecord]) -> R,
    ) -> Option<R> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let records = &inner.records;
        let (version, sub_sequence) = from;

        let start = records.partition_point(|r| r.version_after <= version);
        let next_session_len = records[start..]
            .iter()
            .take_while(|r| r.version_after == version + 1)
            .count();
        if sub_sequence > 0 && (version >= to || sub_sequence > next_session_len) {
            return None;
        }

        let end = records.partition_point(|r| r.version_after <= to);
        let start = (start + sub_sequence).min(end);
        Some(f(&records[start..end]))
    }
}

/// A thread-safe handle for remapping regions across committed versions of one buffer.
///
/// Obtained from [`Buffer::mapper`](crate::Buffer::mapper). The handle only sees committed
/// sessions; use [`Buffer::transform_region_from`](crate::Buffer::transform_region_from) to also
/// account for a session that is still open.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    buffer: BufferId,
    log: Arc<MutationLog>,
}

impl PositionMapper {
    pub(crate) fn new(buffer: BufferId, log: Arc<MutationLog>) -> Self {
        Self { buffer, log }
    }

    /// The buffer this mapper reads.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Latest committed version visible to this handle.
    pub fn head_version(&self) -> u64 {
        self.log.head()
    }

    /// A stamp for committed `version`, for chaining remaps.
    pub fn stamp_at(&self, version: u64) -> Result<VersionStamp, ModelError> {
        let head = self.log.head();
        if version > head {
            return Err(self.invalid(version, head));
        }
        Ok(VersionStamp::new(self.buffer, version, 0))
    }

    /// Project `region`, recorded at `from`, onto committed version `to`.
    pub fn transform_region(
        &self,
        region: Region,
        from: VersionStamp,
        to: u64,
    ) -> Result<Region, ModelError> {
        self.check(from, to)?;
        let mapped = self
            .log
            .with_range(from.position(), to, |records| {
                map_region_through(region, records)
            })
            .ok_or_else(|| self.invalid(from.version, to))?;
        tracing::trace!(buffer = ?self.buffer, from = from.version, to, %region, %mapped, "remapped region");
        Ok(mapped)
    }

    /// Project `region`, recorded at `from`, onto the latest committed version.
    pub fn transform_to_head(&self, region: Region, from: VersionStamp) -> Result<Region, ModelError> {
        self.transform_region(region, from, self.log.head())
    }

    /// Project a single point, recorded at `from`, onto committed version `to`.
    pub fn transform_point(
        &self,
        point: Point,
        bias: Bias,
        from: VersionStamp,
        to: u64,
    ) -> Result<Point, ModelError> {
        self.check(from, to)?;
        self.log
            .with_range(from.position(), to, |records| {
                map_point_through(point, bias, records)
            })
            .ok_or_else(|| self.invalid(from.version, to))
    }

    fn check(&self, from: VersionStamp, to: u64) -> Result<(), ModelError> {
        if from.buffer != self.buffer || from.version > to || to > self.log.head() {
            return Err(self.invalid(from.version, to));
        }
        Ok(())
    }

    fn invalid(&self, stamp_version: u64, current_version: u64) -> ModelError {
        ModelError::InvalidVersionStamp {
            buffer: self.buffer,
            stamp_version,
            current_version,
        }
    }
}
