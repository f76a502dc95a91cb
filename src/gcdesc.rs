//! GC Descriptor Walker (C2)
//!
//! Given an object's base address and computed size, yields the
//! `(reference_address, field_offset)` pairs described by its type's GC
//! descriptor. The walker never dereferences a yielded address — it only
//! computes where the pointer-sized slots live; the caller decides whether
//! and how to resolve what they point to.

/// The repeating element pattern for an array-like type: a fixed set of
/// pointer offsets, relative to the start of one element, repeated every
/// `element_stride` bytes starting at `base_offset` from the object base.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArrayPattern {
    base_offset: u32,
    element_stride: u32,
    element_fields: Vec<u32>,
}

/// Compact per-type encoding of the offsets within an object that hold
/// outgoing references, plus (for arrays) a repeating stride.
///
/// This is deliberately a concrete, owned representation rather than an
/// opaque handle: the type factory that produces these is out of scope, but
/// the walker still needs something to walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcDescriptor {
    /// Fixed (non-array) pointer field offsets, relative to the object base.
    fields: Vec<u32>,
    array: Option<ArrayPattern>,
}

impl GcDescriptor {
    /// A descriptor for a type with no outgoing references at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            fields: Vec::new(),
            array: None,
        }
    }

    /// A descriptor for a non-array type with pointer fields at the given
    /// offsets (relative to the object base).
    #[must_use]
    pub fn with_fields(offsets: &[u32]) -> Self {
        Self {
            fields: offsets.to_vec(),
            array: None,
        }
    }

    /// A descriptor for an array-like type: `element_fields` gives the
    /// pointer offsets within one element (relative to that element's own
    /// base), repeated every `element_stride` bytes starting at
    /// `base_offset` bytes into the object.
    #[must_use]
    pub fn with_array(base_offset: u32, element_stride: u32, element_fields: &[u32]) -> Self {
        Self {
            fields: Vec::new(),
            array: Some(ArrayPattern {
                base_offset,
                element_stride,
                element_fields: element_fields.to_vec(),
            }),
        }
    }

    /// Whether this type carries any outgoing references at all. Types
    /// with an empty descriptor are skipped entirely by the reference
    /// enumerator (§4.6.3).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.array.as_ref().is_none_or(|a| a.element_fields.is_empty())
    }

    /// Walk the descriptor for an object of the given base address and
    /// already-computed size, yielding `(reference_address, field_offset)`
    /// pairs lazily.
    ///
    /// `size` must be the object's full size as computed by
    /// [`crate::align::object_size`]; the element count for array types is
    /// derived from it rather than re-read from memory, since this
    /// descriptor only tracks offsets, not raw bytes.
    #[must_use]
    pub fn walk(&self, obj: u64, size: u64) -> GcDescriptorWalk<'_> {
        GcDescriptorWalk {
            desc: self,
            obj,
            size,
            field_index: 0,
            element_index: 0,
            element_field_index: 0,
        }
    }
}

/// Lazy iterator over the `(reference_address, field_offset)` pairs
/// produced by a [`GcDescriptor`].
#[derive(Debug)]
pub struct GcDescriptorWalk<'a> {
    desc: &'a GcDescriptor,
    obj: u64,
    size: u64,
    field_index: usize,
    element_index: u64,
    element_field_index: usize,
}

impl Iterator for GcDescriptorWalk<'_> {
    type Item = (u64, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(&offset) = self.desc.fields.get(self.field_index) {
            self.field_index += 1;
            return Some((self.obj + offset as u64, offset));
        }

        let array = self.desc.array.as_ref()?;
        if array.element_stride == 0 || array.element_fields.is_empty() {
            if array.element_stride == 0 {
                log::warn!("GC descriptor array pattern has zero element stride; yielding no references");
            }
            return None;
        }

        let base = array.base_offset as u64;
        if self.size <= base {
            return None;
        }
        let element_count = (self.size - base) / array.element_stride as u64;

        loop {
            if self.element_index >= element_count {
                return None;
            }
            if let Some(&field_offset) = array.element_fields.get(self.element_field_index) {
                self.element_field_index += 1;
                let element_base =
                    base + self.element_index * array.element_stride as u64;
                let offset = element_base + field_offset as u64;
                return Some((self.obj + offset, offset as u32));
            }
            self.element_field_index = 0;
            self.element_index += 1;
        }
    }
}

impl std::iter::FusedIterator for GcDescriptorWalk<'_> {}
