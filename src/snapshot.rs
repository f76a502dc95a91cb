//! Heap Snapshot Cache (C4)
//!
//! A single-slot cache of the heap metadata a walk needs: segments,
//! allocation contexts, finalizer-queue segments, and (latched lazily
//! within the snapshot) dependent handles. Built once per generation,
//! published atomically, and replaced wholesale — never mutated in place,
//! aside from the one-shot dependent-handle latch and the segment index's
//! benign last-hit hint.

use crate::alloc_context::AllocationContextMap;
use crate::runtime::Runtime;
use crate::segment::{FinalizerQueueSegment, SegmentIndex};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// A conditional strong reference: while `source` is live, `target` is
/// reachable too (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependentHandle {
    pub source: u64,
    pub target: u64,
}

/// An immutable, atomically published bundle of heap metadata, valid
/// between [`SnapshotCache::clear`] calls.
pub struct Snapshot {
    runtime: Arc<dyn Runtime>,
    pub segment_index: SegmentIndex,
    pub allocation_contexts: AllocationContextMap,
    pub finalizer_root_segments: Vec<FinalizerQueueSegment>,
    pub finalizer_object_segments: Vec<FinalizerQueueSegment>,
    dependent_handles: OnceLock<Vec<DependentHandle>>,
}

impl Snapshot {
    fn build(runtime: Arc<dyn Runtime>) -> Self {
        let mut segments = runtime.segments();
        segments.sort_by_key(|s| s.start);
        log::debug!("rebuilding heap snapshot: {} segment(s)", segments.len());
        Self {
            allocation_contexts: runtime.allocation_contexts(),
            finalizer_root_segments: runtime.finalizer_root_segments(),
            finalizer_object_segments: runtime.finalizer_object_segments(),
            segment_index: SegmentIndex::new(segments),
            runtime,
            dependent_handles: OnceLock::new(),
        }
    }

    /// The dependent-handle array, sorted by `source`. Fetched from the
    /// runtime collaborator and sorted on first access, then latched for
    /// the lifetime of this snapshot.
    pub fn dependent_handles(&self) -> &[DependentHandle] {
        self.dependent_handles.get_or_init(|| {
            let mut handles: Vec<DependentHandle> = self
                .runtime
                .dependent_handles()
                .into_iter()
                .map(|(source, target)| DependentHandle { source, target })
                .collect();
            handles.sort_by_key(|h| h.source);
            handles
        })
    }

    /// All dependent-handle entries whose `source` equals `obj` (§4.6.3,
    /// §8 property 9), in the order they appear in the sorted array —
    /// stable across calls on this snapshot, since the array itself is
    /// latched once.
    pub fn dependent_handles_from(&self, obj: u64) -> &[DependentHandle] {
        let handles = self.dependent_handles();
        let start = handles.partition_point(|h| h.source < obj);
        let end = handles.partition_point(|h| h.source <= obj);
        &handles[start..end]
    }
}

/// Single-slot, lazily-populated cache of [`Snapshot`]s (C4).
pub struct SnapshotCache {
    runtime: Arc<dyn Runtime>,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            current: RwLock::new(None),
        }
    }

    /// Fetch the current snapshot, building one first if the cache is
    /// empty. Double-checks under the write lock so concurrent callers
    /// racing to build never see a partially initialized snapshot and
    /// never build twice.
    pub fn get(&self) -> Arc<Snapshot> {
        if let Some(existing) = self.current.read().as_ref() {
            return Arc::clone(existing);
        }

        let mut guard = self.current.write();
        if let Some(existing) = guard.as_ref() {
            return Arc::clone(existing);
        }

        let snapshot = Arc::new(Snapshot::build(Arc::clone(&self.runtime)));
        *guard = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Drop the current snapshot. The next [`SnapshotCache::get`] rebuilds
    /// from scratch.
    pub fn clear(&self) {
        *self.current.write() = None;
    }
}
