//! Type-factory boundary contract.
//!
//! The type factory is an external collaborator (§1): given a method-table
//! address (or a well-known name) it returns a type descriptor. This crate
//! depends on the descriptors it produces but does not build them.

use crate::gcdesc::GcDescriptor;

/// The four well-known types memoized on heap creation (§3). Used to
/// special-case behavior that depends on *which* well-known type an object
/// is, without the rest of this crate needing to know a type's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownKind {
    Free,
    Object,
    String,
    Exception,
    /// Any type that is not one of the four well-known types.
    Other,
}

/// A type descriptor, as produced by the type factory (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// The method-table address this descriptor was resolved from.
    pub method_table: u64,
    /// Fully-qualified type name, for diagnostics only.
    pub name: String,
    /// Fixed portion of the object's size, in bytes.
    pub static_size: u32,
    /// Size of one array/string element, in bytes; `0` for non-array types.
    pub component_size: u32,
    /// Whether any field (fixed or per-element) holds a pointer.
    pub contains_pointers: bool,
    /// Whether this type belongs to a collectible (unloadable) assembly.
    pub is_collectible: bool,
    /// Address of the pointer-sized slot holding this type's loader
    /// allocator handle. Only meaningful when `is_collectible` is true;
    /// `0` otherwise.
    pub loader_allocator_handle: u64,
    /// The compact encoding of this type's outgoing-reference field
    /// offsets.
    pub gc_descriptor: GcDescriptor,
    /// Which (if any) of the four well-known types this is.
    pub kind: WellKnownKind,
}

impl TypeDescriptor {
    /// Construct a descriptor for a non-collectible, non-well-known type.
    /// The common case for ordinary application types.
    #[must_use]
    pub fn new(
        method_table: u64,
        name: impl Into<String>,
        static_size: u32,
        component_size: u32,
        gc_descriptor: GcDescriptor,
    ) -> Self {
        let contains_pointers = !gc_descriptor.is_empty();
        Self {
            method_table,
            name: name.into(),
            static_size,
            component_size,
            contains_pointers,
            is_collectible: false,
            loader_allocator_handle: 0,
            gc_descriptor,
            kind: WellKnownKind::Other,
        }
    }

    /// Mark this descriptor as belonging to a collectible assembly, with
    /// its loader-allocator handle at `handle_address`.
    #[must_use]
    pub fn collectible(mut self, handle_address: u64) -> Self {
        self.is_collectible = true;
        self.loader_allocator_handle = handle_address;
        self
    }

    /// Tag this descriptor as one of the four well-known types.
    #[must_use]
    pub fn with_kind(mut self, kind: WellKnownKind) -> Self {
        self.kind = kind;
        self
    }

    /// Convenience constructor used only by this crate's own unit tests.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn new_for_test(name: &str, static_size: u32, component_size: u32) -> Self {
        Self::new(0x1, name, static_size, component_size, GcDescriptor::empty())
    }
}

/// Given a method-table address (or a well-known name), returns a type
/// descriptor.
///
/// Implemented by the host, backed by whatever type system the target
/// runtime actually has; this crate only consumes the result.
pub trait TypeFactory: Send + Sync {
    /// Resolve the type at `method_table`. Returns `None` if the method
    /// table is not a valid type (corrupt data, or a stale/freed slot).
    /// `object_hint` is the address of the object being resolved, offered
    /// for factories that need it to disambiguate generic instantiations;
    /// implementations are free to ignore it.
    fn get_or_create_type(&self, method_table: u64, object_hint: u64) -> Option<TypeDescriptor>;

    /// Build one of the four well-known types (`canonical_name` is one of
    /// `"Free"`, `"Object"`, `"String"`, `"Exception"`). Infallible, and
    /// used only once, at heap construction (§6) — the factory is expected
    /// to already know these four method tables by the time a heap is
    /// built, unlike ordinary types discovered while walking.
    fn create_system_type(&self, method_table: u64, canonical_name: &str) -> TypeDescriptor;
}
