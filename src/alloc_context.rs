//! Allocation-Context Skipper (C5)
//!
//! Advances past thread-local allocation windows when linearly scanning a
//! segment. An allocation context is a half-open `[pointer, limit)` range
//! of bump-pointer space a thread has reserved but not yet filled; no live
//! objects lie within it.

use crate::align::{align, min_object_size};
use crate::diagnostics;
use crate::reader::PointerWidth;
use crate::segment::HeapSegment;
use std::collections::BTreeMap;

/// The set of live allocation contexts in a snapshot: `pointer -> limit`.
#[derive(Debug, Clone, Default)]
pub struct AllocationContextMap {
    contexts: BTreeMap<u64, u64>,
}

impl AllocationContextMap {
    /// An empty map (no thread currently holds an allocation context).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(pointer, limit)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self {
            contexts: pairs.into_iter().collect(),
        }
    }

    /// The `limit` for `pointer`, if it is currently a live context.
    #[must_use]
    pub fn get(&self, pointer: u64) -> Option<u64> {
        self.contexts.get(&pointer).copied()
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Sentinel return value meaning "abandon the current sweep": the skipper
/// detected corruption and scanning this segment further is not safe.
pub const ABANDON_SWEEP: u64 = 0;

/// Advance `obj` past any allocation context it lands in, on `segment`.
///
/// On a large-object segment there are no bump-pointer contexts, so `obj`
/// is returned unchanged. Otherwise, while `obj` is the start of a live
/// context, resume at `limit + align(3 * W, small)`. Before every advance
/// the computed next position is checked for non-progress (`obj >= next`)
/// and overshoot (`obj >= segment.end`); either one reports a corruption
/// step and returns [`ABANDON_SWEEP`].
///
/// The original implementation this is grounded on repeated that same
/// check a second time, immediately after the first, which can never fire —
/// this keeps only the reachable check, folding the diagnostic it guarded
/// into the first.
#[must_use]
pub fn skip_allocation_context(
    segment: &HeapSegment,
    obj: u64,
    contexts: &AllocationContextMap,
    pointer_width: PointerWidth,
) -> u64 {
    if segment.is_large_object_segment {
        return obj;
    }

    let step = align(min_object_size(pointer_width), false, pointer_width) as u64;
    let mut current = obj;
    while let Some(limit) = contexts.get(current) {
        let next = limit + step;
        if current >= next || current >= segment.end {
            log::warn!(
                "allocation context at {current:#x} (limit {limit:#x}) did not advance within segment [{:#x}, {:#x}); treating as corruption",
                segment.start,
                segment.end
            );
            diagnostics::record_corruption(current);
            return ABANDON_SWEEP;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_segment() -> HeapSegment {
        HeapSegment::new(0x10000, 0x10000, 0x20000, false)
    }

    // === S4 from §8 ===

    #[test]
    fn s4_allocation_context_skip() {
        let seg = small_segment();
        let contexts = AllocationContextMap::from_pairs([(0x10100, 0x10400)]);
        let next = skip_allocation_context(&seg, 0x10100, &contexts, PointerWidth::Bits64);
        assert!(next >= 0x10418, "expected >= 0x10418, got {next:#x}");
        assert_eq!(next, 0x10418);
    }

    #[test]
    fn address_not_in_any_context_is_unchanged() {
        let seg = small_segment();
        let contexts = AllocationContextMap::new();
        assert_eq!(
            skip_allocation_context(&seg, 0x10100, &contexts, PointerWidth::Bits64),
            0x10100
        );
    }

    #[test]
    fn large_object_segment_never_skips() {
        let seg = HeapSegment::new(0x30000, 0x30000, 0x40000, true);
        let contexts = AllocationContextMap::from_pairs([(0x30000, 0x31000)]);
        assert_eq!(
            skip_allocation_context(&seg, 0x30000, &contexts, PointerWidth::Bits64),
            0x30000
        );
    }

    #[test]
    fn chained_contexts_resolve_through_all_of_them() {
        let seg = small_segment();
        let contexts = AllocationContextMap::from_pairs([
            (0x10100, 0x10200),
            (0x10218, 0x10300), // 0x10200 + align(24) = 0x10218
        ]);
        let next = skip_allocation_context(&seg, 0x10100, &contexts, PointerWidth::Bits64);
        assert_eq!(next, 0x10318); // 0x10300 + align(24)
    }

    #[test]
    fn non_progress_is_reported_as_corruption() {
        let seg = small_segment();
        // limit == pointer itself, and the step is zero-padded so next
        // cannot exceed current: force non-progress via a limit that maps
        // back at or behind current.
        let contexts = AllocationContextMap::from_pairs([(0x10100, 0x10100 - 24)]);
        let next = skip_allocation_context(&seg, 0x10100, &contexts, PointerWidth::Bits64);
        assert_eq!(next, ABANDON_SWEEP);
    }

    #[test]
    fn overshoot_past_segment_end_is_reported_as_corruption() {
        let seg = small_segment();
        let contexts = AllocationContextMap::from_pairs([(0x10100, 0x20000)]);
        let next = skip_allocation_context(&seg, 0x10100, &contexts, PointerWidth::Bits64);
        assert_eq!(next, ABANDON_SWEEP);
    }
}
