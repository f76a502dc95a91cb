//! # heapwalk — managed-heap inspection core
//!
//! `heapwalk` is the heap-walking engine behind a post-mortem diagnostics
//! library: given read-only access to a target process's address space
//! (live or a crash dump) it enumerates the managed objects on that
//! process's garbage-collected heap, their types, their sizes, the
//! references they hold, and the roots that keep them alive.
//!
//! This crate does not read memory itself, does not know how to resolve a
//! method table into a type, and does not introspect a runtime's handle
//! table or thread stacks — those are external collaborators this crate
//! consumes through the [`reader::DataReader`], [`factory::TypeFactory`],
//! and [`runtime::Runtime`] traits. A host binary supplies concrete
//! implementations backed by whatever the target actually exposes (a live
//! process, a minidump, a core file) and builds a [`heap::Heap`] over them.
//!
//! ## Quick start
//!
//! ```no_run
//! use heapwalk::config::HeapWalkConfig;
//! use heapwalk::heap::{Heap, WellKnownMethodTables};
//! use std::sync::Arc;
//! # fn build_collaborators() -> (
//! #     Arc<dyn heapwalk::runtime::Runtime>,
//! #     Arc<dyn heapwalk::reader::DataReader>,
//! #     Arc<dyn heapwalk::factory::TypeFactory>,
//! # ) { unimplemented!() }
//!
//! # fn main() -> heapwalk::error::Result<()> {
//! let (runtime, reader, type_factory) = build_collaborators();
//! let well_known = WellKnownMethodTables {
//!     free: 0x1000,
//!     object: 0x1008,
//!     string: 0x1010,
//!     exception: 0x1018,
//! };
//! let heap = Heap::new(runtime, reader, type_factory, HeapWalkConfig::default(), well_known)?;
//!
//! for object in heap.enumerate_objects() {
//!     if let Some(type_descriptor) = &object.type_descriptor {
//!         println!("{:#x} {} ({} bytes)", object.address, type_descriptor.name, object.size);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`align`]: pointer-width-dependent alignment and object-size rules.
//! - [`gcdesc`]: the GC descriptor walker — outgoing reference offsets.
//! - [`segment`]: the sorted heap-segment index and finalizer-queue segments.
//! - [`alloc_context`]: skips thread-local allocation windows during a scan.
//! - [`snapshot`]: the lazily-built, atomically published heap snapshot cache.
//! - [`heap`]: the public façade — object and reference enumeration.
//! - [`roots`]: strong-handle, finalizer, and stack root enumeration.
//! - [`module`]: per-module PE/ELF metadata (version, managed-ness, PDB).
//! - [`diagnostics`]: the opt-in per-thread heap-walk-step ring buffer.
//! - [`reader`]: the `DataReader` boundary contract.
//! - [`factory`]: the type-factory boundary contract.
//! - [`runtime`]: the runtime-handle boundary contract.
//! - [`config`]: tunable parameters (large-object threshold, diagnostics).
//! - [`error`]: error types for invalid-argument and construction failures.
//!
//! ## Thread safety
//!
//! [`heap::Heap`] is `Send + Sync` and safe for concurrent readers: snapshot
//! publication is atomic, the segment index's warm-cache hint is a benign
//! race, and the diagnostic buffer is thread-local. See §5 of the design
//! notes carried in this repository's `SPEC_FULL.md` for the full
//! concurrency model.

pub mod align;
pub mod alloc_context;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod factory;
pub mod gcdesc;
pub mod heap;
pub mod module;
pub mod reader;
pub mod roots;
pub mod runtime;
pub mod segment;
pub mod snapshot;

pub use config::HeapWalkConfig;
pub use error::{HeapError, Result};
pub use heap::{Heap, WellKnownMethodTables};

/// `heapwalk` version string from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
