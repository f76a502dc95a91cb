//! Runtime boundary contract.
//!
//! The `Runtime` trait is the "runtime handle" a [`crate::heap::Heap`]
//! owns (§3): it is how the core reaches the target's handle table,
//! finalizer queues, thread stacks, and segment layout. Like `DataReader`
//! and the type factory, this crate consumes it but does not implement
//! it — a real host backs it with whatever introspection the target
//! runtime actually exposes.

use crate::alloc_context::AllocationContextMap;
use crate::segment::{FinalizerQueueSegment, HeapSegment};

/// The target runtime's heap and root metadata, as seen by a fresh
/// snapshot build (C4) and by root enumeration (C7).
pub trait Runtime: Send + Sync {
    /// All heap segments, in any order — the snapshot builder sorts them.
    fn segments(&self) -> Vec<HeapSegment>;

    /// The live allocation contexts at the moment of the snapshot.
    fn allocation_contexts(&self) -> AllocationContextMap;

    /// Segments whose slots hold addresses of finalizer *roots* — objects
    /// reachable from the finalizer queue and therefore still alive.
    fn finalizer_root_segments(&self) -> Vec<FinalizerQueueSegment>;

    /// Segments whose slots hold addresses of objects pending
    /// finalization but otherwise unreachable.
    fn finalizer_object_segments(&self) -> Vec<FinalizerQueueSegment>;

    /// All `(source, target)` dependent-handle pairs, in any order — the
    /// snapshot latches and sorts them by `source` on first access.
    fn dependent_handles(&self) -> Vec<(u64, u64)>;

    /// Addresses of every *strong* handle (weak and pinned-weak handles
    /// are filtered out by the runtime before they reach this crate).
    fn strong_handles(&self) -> Vec<u64>;

    /// Addresses of every stack-root slot across every live thread. The
    /// per-thread enumeration is the runtime's concern; this crate only
    /// consumes the flattened result.
    fn stack_roots(&self) -> Vec<u64>;

    /// Whether the target runtime collects with a dedicated thread per
    /// logical heap (server GC) rather than one heap for the process.
    fn is_server(&self) -> bool;

    /// Number of logical heaps (1 for workstation GC).
    fn logical_heap_count(&self) -> usize;

    /// Whether the target is in a state where the heap can safely be
    /// walked at all (e.g. not mid-relocation in a live process).
    fn can_walk_heap(&self) -> bool;
}
