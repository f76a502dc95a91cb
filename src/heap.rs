//! Object & Reference Enumerator (C6) + public façade (§6)
//!
//! [`Heap`] is the crate's entry point: it owns the runtime handle, the
//! boundary collaborators, the snapshot cache, and the four well-known
//! types memoized at construction. Every other module in this crate is a
//! piece `Heap` composes.

use crate::align;
use crate::alloc_context::{skip_allocation_context, ABANDON_SWEEP};
use crate::config::HeapWalkConfig;
use crate::diagnostics;
use crate::error::Result;
use crate::factory::{TypeDescriptor, TypeFactory, WellKnownKind};
use crate::reader::{DataReader, PointerWidth};
use crate::roots::{self, Root};
use crate::segment::HeapSegment;
use crate::snapshot::SnapshotCache;
use std::sync::Arc;

use crate::runtime::Runtime;

/// The method-table addresses of the four well-known types, supplied by
/// the host at heap construction (§6: `create_system_type` is "used only
/// at heap construction").
#[derive(Debug, Clone, Copy)]
pub struct WellKnownMethodTables {
    pub free: u64,
    pub object: u64,
    pub string: u64,
    pub exception: u64,
}

/// One object on the managed heap, as produced by [`Heap::enumerate_objects`].
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub address: u64,
    pub method_table: u64,
    /// `None` when the method table failed to resolve — a typeless
    /// object is still reported (§7 "unknown method table"), but the
    /// scan of its containing segment stops there since the object's
    /// true size can't be computed.
    pub type_descriptor: Option<TypeDescriptor>,
    pub size: u64,
}

/// Which pass of [`Heap::enumerate_object_references`] produced a
/// reference (§4.6.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    DependentHandle,
    CollectibleOwner,
    Field { containing_type: u64, field_offset: u32 },
}

/// One outgoing reference, tagged with the metadata
/// [`Heap::enumerate_references_with_fields`] adds (§4.6.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub target: u64,
    pub kind: ReferenceKind,
}

/// The managed-heap inspection core's public façade (§3, §6).
pub struct Heap {
    runtime: Arc<dyn Runtime>,
    reader: Arc<dyn DataReader>,
    type_factory: Arc<dyn TypeFactory>,
    cache: SnapshotCache,
    config: HeapWalkConfig,

    pub free_type: TypeDescriptor,
    pub object_type: TypeDescriptor,
    pub string_type: TypeDescriptor,
    pub exception_type: TypeDescriptor,

    pub is_server: bool,
    pub logical_heap_count: usize,
    pub can_walk_heap: bool,
}

impl Heap {
    /// Construct a heap over `runtime`, memoizing the four well-known
    /// types via `type_factory.create_system_type` (§6). The snapshot
    /// itself is not built here — it is lazily populated on first use,
    /// per C4.
    pub fn new(
        runtime: Arc<dyn Runtime>,
        reader: Arc<dyn DataReader>,
        type_factory: Arc<dyn TypeFactory>,
        config: HeapWalkConfig,
        well_known: WellKnownMethodTables,
    ) -> Result<Self> {
        config.validate()?;

        let free_type = type_factory
            .create_system_type(well_known.free, "Free")
            .with_kind(WellKnownKind::Free);
        let object_type = type_factory
            .create_system_type(well_known.object, "Object")
            .with_kind(WellKnownKind::Object);
        let string_type = type_factory
            .create_system_type(well_known.string, "String")
            .with_kind(WellKnownKind::String);
        let exception_type = type_factory
            .create_system_type(well_known.exception, "Exception")
            .with_kind(WellKnownKind::Exception);

        let is_server = runtime.is_server();
        let logical_heap_count = runtime.logical_heap_count();
        let can_walk_heap = runtime.can_walk_heap();
        let cache = SnapshotCache::new(Arc::clone(&runtime));

        Ok(Self {
            runtime,
            reader,
            type_factory,
            cache,
            config,
            free_type,
            object_type,
            string_type,
            exception_type,
            is_server,
            logical_heap_count,
            can_walk_heap,
        })
    }

    /// The runtime handle this heap was built over.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// The current snapshot's segments, in `start` order.
    #[must_use]
    pub fn segments(&self) -> Vec<HeapSegment> {
        self.cache.get().segment_index.as_slice().to_vec()
    }

    /// Drop the cached snapshot; the next operation rebuilds it (§4.4).
    pub fn clear_cached_data(&self) {
        self.cache.clear();
    }

    /// Resolve the type at `addr`'s method-table pointer, per §4.6.2.
    #[must_use]
    pub fn get_object_type(&self, addr: u64) -> Option<TypeDescriptor> {
        let method_table = self.reader.read_pointer(addr);
        if method_table == 0 {
            return None;
        }
        self.type_factory.get_or_create_type(method_table, addr)
    }

    /// The segment containing `addr`, if any (§4.3).
    #[must_use]
    pub fn get_segment_by_address(&self, addr: u64) -> Option<HeapSegment> {
        self.cache.get().segment_index.get_segment_by_address(addr)
    }

    /// The raw, unaligned size of the object at `addr` given its resolved
    /// type (§4.1). Alignment is never applied here (see [`align::object_size`]).
    #[must_use]
    pub fn get_object_size(&self, addr: u64, type_descriptor: &TypeDescriptor) -> u64 {
        align::object_size(self.reader.as_ref(), addr, type_descriptor)
    }

    /// Lazily walk every heap segment in order, yielding one
    /// [`ObjectRecord`] per live object (§4.6.1). Never materializes the
    /// full heap — this is a pull-based iterator over the current
    /// snapshot.
    #[must_use]
    pub fn enumerate_objects(&self) -> EnumerateObjects {
        EnumerateObjects {
            snapshot: self.cache.get(),
            reader: Arc::clone(&self.reader),
            type_factory: Arc::clone(&self.type_factory),
            segment_index: 0,
            cursor: None,
            done: false,
        }
    }

    /// The plain target-address stream for `enumerate_object_references`,
    /// per §4.6.3.
    #[must_use]
    pub fn enumerate_object_references(
        &self,
        obj: u64,
        type_descriptor: &TypeDescriptor,
        carefully: bool,
        consider_dependent_handles: bool,
    ) -> Vec<u64> {
        self.reference_stream(obj, type_descriptor, carefully, consider_dependent_handles)
            .into_iter()
            .map(|r| r.target)
            .collect()
    }

    /// Same as [`Self::enumerate_object_references`] but every reference
    /// carries the metadata described in §4.6.4.
    #[must_use]
    pub fn enumerate_references_with_fields(
        &self,
        obj: u64,
        type_descriptor: &TypeDescriptor,
        carefully: bool,
        consider_dependent_handles: bool,
    ) -> Vec<ReferenceRecord> {
        self.reference_stream(obj, type_descriptor, carefully, consider_dependent_handles)
    }

    fn reference_stream(
        &self,
        obj: u64,
        type_descriptor: &TypeDescriptor,
        carefully: bool,
        consider_dependent_handles: bool,
    ) -> Vec<ReferenceRecord> {
        let snapshot = self.cache.get();
        let mut refs = Vec::new();

        if consider_dependent_handles {
            for handle in snapshot.dependent_handles_from(obj) {
                refs.push(ReferenceRecord {
                    target: handle.target,
                    kind: ReferenceKind::DependentHandle,
                });
            }
        }

        if type_descriptor.is_collectible {
            let owner = self.reader.read_pointer(type_descriptor.loader_allocator_handle);
            if owner != 0 {
                refs.push(ReferenceRecord {
                    target: owner,
                    kind: ReferenceKind::CollectibleOwner,
                });
            }
        }

        if type_descriptor.contains_pointers && !type_descriptor.gc_descriptor.is_empty() {
            let size = self.get_object_size(obj, type_descriptor);
            let allowed = if carefully {
                match snapshot.segment_index.get_segment_by_address(obj) {
                    Some(segment) => {
                        let within_bounds = obj.checked_add(size).is_some_and(|end| end <= segment.end);
                        let under_threshold = segment.is_large_object_segment
                            || size <= self.config.large_object_threshold as u64;
                        within_bounds && under_threshold
                    }
                    None => false,
                }
            } else {
                true
            };

            if allowed {
                let containing_type = type_descriptor.method_table;
                for (address, field_offset) in type_descriptor.gc_descriptor.walk(obj, size) {
                    refs.push(ReferenceRecord {
                        target: address,
                        kind: ReferenceKind::Field {
                            containing_type,
                            field_offset,
                        },
                    });
                }
            }
        }

        refs
    }

    /// The full root union: strong handles, finalizer roots, stack roots
    /// (§4.7).
    #[must_use]
    pub fn enumerate_roots(&self) -> Vec<Root> {
        let snapshot = self.cache.get();
        roots::enumerate_roots(&snapshot, self.reader.as_ref(), self.type_factory.as_ref(), self.runtime.as_ref())
    }

    /// Just the finalizer-root pass of [`Self::enumerate_roots`].
    #[must_use]
    pub fn enumerate_finalizer_roots(&self) -> Vec<Root> {
        let snapshot = self.cache.get();
        roots::finalizer_roots(&snapshot, self.reader.as_ref(), self.type_factory.as_ref())
    }

    /// Objects pending finalization but already unreachable through
    /// normal roots (§4.7).
    #[must_use]
    pub fn enumerate_finalizable_objects(&self) -> Vec<u64> {
        let snapshot = self.cache.get();
        roots::enumerate_finalizable_objects(&snapshot, self.reader.as_ref())
    }
}

/// Lazy, segment-by-segment object walk (§4.6.1). Holds only `Arc`s, so
/// cloning the iterator's captured state is cheap and it outlives the
/// [`Heap`] call that created it.
pub struct EnumerateObjects {
    snapshot: Arc<crate::snapshot::Snapshot>,
    reader: Arc<dyn DataReader>,
    type_factory: Arc<dyn TypeFactory>,
    segment_index: usize,
    cursor: Option<u64>,
    done: bool,
}

impl Iterator for EnumerateObjects {
    type Item = ObjectRecord;

    fn next(&mut self) -> Option<ObjectRecord> {
        if self.done {
            return None;
        }

        loop {
            let segments = self.snapshot.segment_index.as_slice();
            let segment = match segments.get(self.segment_index) {
                Some(s) => *s,
                None => {
                    self.done = true;
                    return None;
                }
            };

            let addr = self.cursor.unwrap_or(segment.first_object_address);
            if addr >= segment.end {
                self.segment_index += 1;
                self.cursor = None;
                continue;
            }

            let pointer_width = self.reader.pointer_width();
            let method_table = self.reader.read_pointer(addr);
            if method_table == 0 {
                // Empty slot: this segment's live objects are exhausted.
                self.segment_index += 1;
                self.cursor = None;
                continue;
            }

            let type_descriptor = self.type_factory.get_or_create_type(method_table, addr);
            let (size, component_size) = match &type_descriptor {
                Some(td) => (
                    align::object_size(self.reader.as_ref(), addr, td),
                    td.component_size,
                ),
                None => (align::min_object_size(pointer_width) as u64, 0),
            };

            diagnostics::record_step(diagnostics::StepRecord::object(
                addr,
                method_table,
                size,
                component_size,
                0,
            ));

            let record = ObjectRecord {
                address: addr,
                method_table,
                type_descriptor: type_descriptor.clone(),
                size,
            };

            if type_descriptor.is_none() {
                // Can't know where the next object starts; stop this
                // segment here rather than guess.
                self.segment_index += 1;
                self.cursor = None;
                return Some(record);
            }

            let aligned_size = align::align(size as usize, segment.is_large_object_segment, pointer_width) as u64;
            let next = addr + aligned_size;
            let skipped = skip_allocation_context(&segment, next, &self.snapshot.allocation_contexts, pointer_width);
            if skipped == ABANDON_SWEEP {
                self.segment_index += 1;
                self.cursor = None;
            } else {
                self.cursor = Some(skipped);
            }

            return Some(record);
        }
    }
}

impl std::iter::FusedIterator for EnumerateObjects {}
