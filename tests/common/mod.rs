//! Shared fake harness for integration tests.
//!
//! Integration tests compile as a separate crate, so they can't reach the
//! `#[cfg(test)]` fixtures colocated with the unit tests — this module
//! plays the same role `fgc/tests/common/mod.rs` plays for the teacher's
//! integration suite: one reusable fake per boundary collaborator.

use heapwalk::alloc_context::AllocationContextMap;
use heapwalk::factory::{TypeDescriptor, TypeFactory};
use heapwalk::gcdesc::GcDescriptor;
use heapwalk::reader::{DataReader, PointerWidth, VersionInfo};
use heapwalk::runtime::Runtime;
use heapwalk::segment::{FinalizerQueueSegment, HeapSegment};
use std::collections::HashMap;
use std::sync::Mutex;

/// Initialize `env_logger` once per test binary so the ambient `log::*!`
/// calls this crate makes (snapshot rebuilds, corruption, PE parse
/// failures) are visible with `--nocapture`. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const FREE_MT: u64 = 0x9000_0001;
pub const OBJECT_MT: u64 = 0x9000_0002;
pub const STRING_MT: u64 = 0x9000_0003;
pub const EXCEPTION_MT: u64 = 0x9000_0004;

/// A byte-addressable fake target, backed by a sparse map. Unmapped bytes
/// read as a failed read (empty `Vec`), matching the `DataReader` contract.
pub struct FakeReader {
    pointer_width: PointerWidth,
    bytes: Mutex<HashMap<u64, u8>>,
    versions: Mutex<HashMap<u64, VersionInfo>>,
}

impl FakeReader {
    pub fn new(pointer_width: PointerWidth) -> Self {
        Self {
            pointer_width,
            bytes: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn write_u32(&self, addr: u64, value: u32) {
        let mut bytes = self.bytes.lock().unwrap();
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            bytes.insert(addr + i as u64, *b);
        }
    }

    pub fn write_u64(&self, addr: u64, value: u64) {
        let mut bytes = self.bytes.lock().unwrap();
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            bytes.insert(addr + i as u64, *b);
        }
    }

    pub fn write_pointer(&self, addr: u64, value: u64) {
        match self.pointer_width {
            PointerWidth::Bits32 => self.write_u32(addr, value as u32),
            PointerWidth::Bits64 => self.write_u64(addr, value),
        }
    }

    pub fn set_version(&self, base: u64, version: VersionInfo) {
        self.versions.lock().unwrap().insert(base, version);
    }
}

impl DataReader for FakeReader {
    fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        if len == 0 {
            return Vec::new();
        }
        let bytes = self.bytes.lock().unwrap();
        let any_present = (0..len as u64).any(|i| bytes.contains_key(&(addr + i)));
        if !any_present {
            return Vec::new();
        }
        (0..len as u64)
            .map(|i| bytes.get(&(addr + i)).copied().unwrap_or(0))
            .collect()
    }

    fn get_version_info(&self, base: u64) -> Option<VersionInfo> {
        self.versions.lock().unwrap().get(&base).copied()
    }
}

/// A type factory backed by a fixed table of method tables registered up
/// front by the test, plus the four well-known types.
#[derive(Default)]
pub struct FakeTypeFactory {
    types: Mutex<HashMap<u64, TypeDescriptor>>,
}

impl FakeTypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_descriptor: TypeDescriptor) {
        self.types
            .lock()
            .unwrap()
            .insert(type_descriptor.method_table, type_descriptor);
    }
}

impl TypeFactory for FakeTypeFactory {
    fn get_or_create_type(&self, method_table: u64, _object_hint: u64) -> Option<TypeDescriptor> {
        self.types.lock().unwrap().get(&method_table).cloned()
    }

    fn create_system_type(&self, method_table: u64, name: &str) -> TypeDescriptor {
        TypeDescriptor::new(method_table, name, 24, 0, GcDescriptor::empty())
    }
}

/// A runtime handle whose every facet a test can configure directly.
#[derive(Default)]
pub struct FakeRuntime {
    pub segments: Vec<HeapSegment>,
    pub contexts: AllocationContextMap,
    pub finalizer_root_segments: Vec<FinalizerQueueSegment>,
    pub finalizer_object_segments: Vec<FinalizerQueueSegment>,
    pub dependent_handles: Vec<(u64, u64)>,
    pub strong_handles: Vec<u64>,
    pub stack_roots: Vec<u64>,
    pub is_server: bool,
    pub logical_heap_count: usize,
    pub can_walk_heap: bool,
}

impl FakeRuntime {
    pub fn single_segment(segment: HeapSegment) -> Self {
        Self {
            segments: vec![segment],
            logical_heap_count: 1,
            can_walk_heap: true,
            ..Default::default()
        }
    }
}

impl Runtime for FakeRuntime {
    fn segments(&self) -> Vec<HeapSegment> {
        self.segments.clone()
    }
    fn allocation_contexts(&self) -> AllocationContextMap {
        self.contexts.clone()
    }
    fn finalizer_root_segments(&self) -> Vec<FinalizerQueueSegment> {
        self.finalizer_root_segments.clone()
    }
    fn finalizer_object_segments(&self) -> Vec<FinalizerQueueSegment> {
        self.finalizer_object_segments.clone()
    }
    fn dependent_handles(&self) -> Vec<(u64, u64)> {
        self.dependent_handles.clone()
    }
    fn strong_handles(&self) -> Vec<u64> {
        self.strong_handles.clone()
    }
    fn stack_roots(&self) -> Vec<u64> {
        self.stack_roots.clone()
    }
    fn is_server(&self) -> bool {
        self.is_server
    }
    fn logical_heap_count(&self) -> usize {
        self.logical_heap_count
    }
    fn can_walk_heap(&self) -> bool {
        self.can_walk_heap
    }
}

pub fn well_known_method_tables() -> heapwalk::heap::WellKnownMethodTables {
    heapwalk::heap::WellKnownMethodTables {
        free: FREE_MT,
        object: OBJECT_MT,
        string: STRING_MT,
        exception: EXCEPTION_MT,
    }
}
