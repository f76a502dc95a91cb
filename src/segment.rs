//! Segment Index (C3)
//!
//! A heap segment is a contiguous region of the managed heap. Within a
//! snapshot, segments are held as a sorted, immutable array; address lookup
//! uses a warm-cache hint because heap walks are overwhelmingly sequential.

use crate::reader::PointerWidth;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A contiguous region of the managed heap (§3).
///
/// Invariant: `start <= first_object_address <= end`;
/// `length == end - start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSegment {
    pub start: u64,
    pub first_object_address: u64,
    pub end: u64,
    pub is_large_object_segment: bool,
}

impl HeapSegment {
    /// Construct a segment, panicking if the basic ordering invariant is
    /// violated. Segment construction is the caller's (the data target's)
    /// responsibility; a violated invariant here is a programming error in
    /// that caller, not a data-quality problem this crate should tolerate.
    #[must_use]
    pub fn new(start: u64, first_object_address: u64, end: u64, is_large_object_segment: bool) -> Self {
        assert!(
            start <= first_object_address && first_object_address <= end,
            "segment invariant violated: start={start:#x} first_object={first_object_address:#x} end={end:#x}"
        );
        Self {
            start,
            first_object_address,
            end,
            is_large_object_segment,
        }
    }

    /// `end - start`.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.end - self.start
    }

    /// Whether `addr` falls within `[start, end)`.
    #[must_use]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// A sorted, non-overlapping, immutable array of heap segments with a
/// warm-cache address lookup (C3).
///
/// The cached last-hit index is a benign race under concurrent lookups: a
/// torn read of the hint can only make the next lookup slower, never
/// incorrect, because every candidate is re-validated against its own
/// bounds before being returned.
#[derive(Debug)]
pub struct SegmentIndex {
    segments: Vec<HeapSegment>,
    last_hit: AtomicUsize,
}

impl SegmentIndex {
    /// Build an index over `segments`, which must already be sorted by
    /// `start` and non-overlapping (segment monotonicity, §8 property 1).
    /// This is a caller invariant, not something this crate re-derives —
    /// callers build `segments` from a target's own metadata, where the
    /// ordering is already established.
    #[must_use]
    pub fn new(segments: Vec<HeapSegment>) -> Self {
        debug_assert!(
            segments.windows(2).all(|w| w[0].start < w[1].start),
            "segments must be sorted and non-overlapping"
        );
        Self {
            segments,
            last_hit: AtomicUsize::new(0),
        }
    }

    /// The segments, in `start` order.
    #[must_use]
    pub fn as_slice(&self) -> &[HeapSegment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Find the segment containing `addr`, per §4.3.
    ///
    /// Rejects immediately if `addr` falls before the first segment's
    /// first object or at/after the last segment's end. Otherwise walks
    /// circularly from the cached last-hit index — the common case is a
    /// hit on the very next probe, since heap walks scan forward through
    /// segments in order.
    #[must_use]
    pub fn get_segment_by_address(&self, addr: u64) -> Option<HeapSegment> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        if addr < first.first_object_address || addr >= last.end {
            return None;
        }

        let len = self.segments.len();
        let start_index = self.last_hit.load(Ordering::Relaxed) % len;

        let mut index = start_index;
        loop {
            let segment = self.segments[index];
            // Unsigned subtraction interpreted as signed: addresses before
            // `start` wrap to a huge offset and fail the `< length` check
            // below without a branch.
            let offset = addr.wrapping_sub(segment.start);
            if offset < segment.length() {
                self.last_hit.store(index, Ordering::Relaxed);
                return Some(segment);
            }

            index = (index + 1) % len;
            if index == start_index {
                return None;
            }
        }
    }
}

/// A contiguous region whose slots each hold a pointer-sized address of a
/// pending-finalization object (or zero, which is skipped); used both for
/// finalizer-root segments and finalizer-object segments (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizerQueueSegment {
    pub start: u64,
    pub end: u64,
}

impl FinalizerQueueSegment {
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Every pointer-sized slot address in `[start, end)`, in order. Zero
    /// slots are not filtered here — callers skip them when they read the
    /// slot's contents, since this type has no reader to consult.
    pub fn slot_addresses(&self, pointer_width: PointerWidth) -> impl Iterator<Item = u64> + '_ {
        let step = pointer_width.bytes() as u64;
        let end = self.end;
        let mut addr = self.start;
        std::iter::from_fn(move || {
            if addr >= end {
                None
            } else {
                let current = addr;
                addr += step;
                Some(current)
            }
        })
    }
}
