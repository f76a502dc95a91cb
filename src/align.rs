//! Alignment & Object-Size Rules (C1)
//!
//! Pointer-width-dependent alignment, the small-object minimum size, and the
//! string trailing-null correction. Every other component that needs to
//! reason about object sizes or alignment goes through here rather than
//! re-deriving the arithmetic.

use crate::factory::{TypeDescriptor, WellKnownKind};
use crate::reader::{DataReader, PointerWidth};

/// Large-object-heap alignment: 8 bytes regardless of pointer width.
pub const ALIGN_LARGE: usize = 7;

/// Minimum object size, in pointer-widths (`3 * W`).
const MIN_OBJECT_SIZE_WIDTHS: usize = 3;

/// Alignment mask for the small-object heap: `W - 1`.
#[inline]
#[must_use]
pub const fn align_small(pointer_width: PointerWidth) -> usize {
    pointer_width.bytes() - 1
}

/// Align `size` up to the boundary implied by `large`.
///
/// `large` selects the large-object-heap alignment (8 bytes, independent of
/// pointer width) over the small-object alignment (`W - 1`).
#[inline]
#[must_use]
pub const fn align(size: usize, large: bool, pointer_width: PointerWidth) -> usize {
    let a = if large {
        ALIGN_LARGE
    } else {
        align_small(pointer_width)
    };
    (size + a) & !a
}

/// Minimum object size: `3 * W` bytes.
#[inline]
#[must_use]
pub const fn min_object_size(pointer_width: PointerWidth) -> usize {
    MIN_OBJECT_SIZE_WIDTHS * pointer_width.bytes()
}

/// Raise `size` to the `3 * W` floor if it falls below it.
#[inline]
#[must_use]
pub const fn floor_object_size(size: usize, pointer_width: PointerWidth) -> usize {
    let min = min_object_size(pointer_width);
    if size < min {
        min
    } else {
        size
    }
}

/// Compute the size of the object at `obj` given its resolved type (§4.1).
///
/// For a non-array type (`component_size == 0`), the size is simply the
/// type's static size. For an array-like type, reads a 32-bit element
/// count at offset `W` within the object, applies the string trailing-null
/// correction when `type_desc` is the well-known string type, then computes
/// `count * component_size + static_size`. The result is floored at
/// `3 * W` in both cases; alignment is *not* applied here — only the
/// allocation-context skipper aligns sizes.
///
/// Unreadable memory is treated as a zero count, per the reader contract:
/// the caller sees a correspondingly small (but never under-floored)
/// object rather than an error.
pub fn object_size(reader: &dyn DataReader, obj: u64, type_desc: &TypeDescriptor) -> u64 {
    let pw = reader.pointer_width();
    if type_desc.component_size == 0 {
        return floor_object_size(type_desc.static_size as usize, pw) as u64;
    }

    let count_addr = obj + pw.bytes() as u64;
    let mut count = reader.read_u32(count_addr).unwrap_or(0) as u64;
    if type_desc.kind == WellKnownKind::String {
        count = count.saturating_add(1);
    }

    let size = count
        .saturating_mul(type_desc.component_size as u64)
        .saturating_add(type_desc.static_size as u64);
    floor_object_size(size as usize, pw) as u64
}
