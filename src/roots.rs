//! Root Enumerator (C7)
//!
//! The union of strong handles, finalizer roots, and stack roots (§4.7).
//! Handle-table and stack enumeration are the runtime collaborator's
//! concern; this module only walks the finalizer-queue segments itself,
//! since those live in the heap snapshot rather than behind the runtime
//! boundary.

use crate::factory::TypeDescriptor;
use crate::reader::DataReader;
use crate::runtime::Runtime;
use crate::snapshot::Snapshot;

/// Which of the three root sources produced a [`Root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Strong,
    Finalizer,
    Stack,
}

/// One GC root (§4.7). `slot_address` is the address of the root itself
/// (a handle, a finalizer-queue slot, or a stack slot); `object` is the
/// address it points to. For strong-handle and stack roots, the boundary
/// collaborator exposes only the target address, so `slot_address` and
/// `object` are the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub slot_address: u64,
    pub object: u64,
    pub kind: RootKind,
    /// The resolved type of `object`, populated only for finalizer roots
    /// (§4.7.2 resolves the type as part of deciding whether to emit the
    /// root at all); `None` for strong-handle and stack roots.
    pub type_descriptor: Option<TypeDescriptor>,
}

fn strong_handle_roots(runtime: &dyn Runtime) -> Vec<Root> {
    runtime
        .strong_handles()
        .into_iter()
        .map(|addr| Root {
            slot_address: addr,
            object: addr,
            kind: RootKind::Strong,
            type_descriptor: None,
        })
        .collect()
}

fn stack_roots(runtime: &dyn Runtime) -> Vec<Root> {
    runtime
        .stack_roots()
        .into_iter()
        .map(|addr| Root {
            slot_address: addr,
            object: addr,
            kind: RootKind::Stack,
            type_descriptor: None,
        })
        .collect()
}

/// Walk every finalizer-root segment slot by slot, emitting a root for
/// every non-zero slot whose object's type resolves (§4.7.2). A slot
/// whose object has no resolvable type is silently skipped, per the
/// "unknown method table" policy for roots (§7).
pub fn finalizer_roots(
    snapshot: &Snapshot,
    reader: &dyn DataReader,
    type_factory: &dyn crate::factory::TypeFactory,
) -> Vec<Root> {
    let pointer_width = reader.pointer_width();
    let mut roots = Vec::new();
    for segment in &snapshot.finalizer_root_segments {
        for slot in segment.slot_addresses(pointer_width) {
            let object = reader.read_pointer(slot);
            if object == 0 {
                continue;
            }
            let method_table = reader.read_pointer(object);
            if method_table == 0 {
                continue;
            }
            if let Some(type_descriptor) = type_factory.get_or_create_type(method_table, object) {
                roots.push(Root {
                    slot_address: slot,
                    object,
                    kind: RootKind::Finalizer,
                    type_descriptor: Some(type_descriptor),
                });
            }
        }
    }
    roots
}

/// The full root union, in the order named by §4.7: strong handles, then
/// finalizer roots, then stack roots. Multiplicity from each source is
/// preserved (§8 property 7).
pub fn enumerate_roots(
    snapshot: &Snapshot,
    reader: &dyn DataReader,
    type_factory: &dyn crate::factory::TypeFactory,
    runtime: &dyn Runtime,
) -> Vec<Root> {
    let mut roots = strong_handle_roots(runtime);
    roots.extend(finalizer_roots(snapshot, reader, type_factory));
    roots.extend(stack_roots(runtime));
    roots
}

/// Objects pending finalization but already unreachable through normal
/// roots: the same walk as [`finalizer_roots`] but over the
/// finalizer-*object* segments, and yielding the objects themselves
/// rather than roots (§4.7).
pub fn enumerate_finalizable_objects(snapshot: &Snapshot, reader: &dyn DataReader) -> Vec<u64> {
    let pointer_width = reader.pointer_width();
    let mut objects = Vec::new();
    for segment in &snapshot.finalizer_object_segments {
        for slot in segment.slot_addresses(pointer_width) {
            let object = reader.read_pointer(slot);
            if object != 0 {
                objects.push(object);
            }
        }
    }
    objects
}
