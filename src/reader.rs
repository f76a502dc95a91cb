//! `DataReader` boundary contract.
//!
//! The low-level byte reader over the target address space is an external
//! collaborator (§1): this crate consumes it, never implements it. This
//! module only defines the trait contract and the small value types it
//! exchanges.

/// Pointer width of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    /// 32-bit target.
    Bits32,
    /// 64-bit target.
    Bits64,
}

impl PointerWidth {
    /// Size of a pointer on this target, in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

/// The four-part file/product version published by a PE resource, read via
/// [`DataReader::get_version_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

/// Read-only access to a target process's address space (live process or
/// crash dump).
///
/// All reads may fail — the target may be partially paged out, the dump
/// truncated, or the address simply invalid. Per the error-handling design
/// (§7), a failed read is never an error from the reader's point of view:
/// implementations return an empty byte vector (or `None`, for
/// `get_version_info`) and every consumer in this crate treats that as
/// end-of-data for the affected slot (a zero method table, a zero count, an
/// absent version).
pub trait DataReader: Send + Sync {
    /// The pointer width of the target.
    fn pointer_width(&self) -> PointerWidth;

    /// Read `len` bytes starting at `addr`. Returns fewer than `len` bytes
    /// (possibly zero) if the read could not be satisfied in full; callers
    /// must treat a short read as a failed read, not a partial success.
    fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8>;

    /// Best-effort version-resource lookup for the module whose image
    /// starts at `base`. Returns `None` if no version resource could be
    /// found or parsed.
    fn get_version_info(&self, base: u64) -> Option<VersionInfo>;

    /// Read a pointer-sized value at `addr`, widened to `u64`. Returns `0`
    /// on a failed read, per the reader contract.
    fn read_pointer(&self, addr: u64) -> u64 {
        match self.pointer_width() {
            PointerWidth::Bits32 => self.read_u32(addr).unwrap_or(0) as u64,
            PointerWidth::Bits64 => self.read_u64(addr).unwrap_or(0),
        }
    }

    /// Read a little-endian `u32` at `addr`. Returns `None` on a failed or
    /// short read.
    fn read_u32(&self, addr: u64) -> Option<u32> {
        let bytes = self.read_bytes(addr, 4);
        let arr: [u8; 4] = bytes.get(0..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(arr))
    }

    /// Read a little-endian `u64` at `addr`. Returns `None` on a failed or
    /// short read.
    fn read_u64(&self, addr: u64) -> Option<u64> {
        let bytes = self.read_bytes(addr, 8);
        let arr: [u8; 8] = bytes.get(0..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(arr))
    }
}

/// Shared in-memory [`DataReader`] fake used by this crate's own unit tests.
///
/// Integration tests under `tests/` define their own fixture rather than
/// reaching into this module, since `#[cfg(test)]` items are not visible
/// outside the crate.
#[cfg(test)]
pub mod test_support {
    use super::{DataReader, PointerWidth, VersionInfo};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A `DataReader` backed by a sparse map of bytes, for synthesizing
    /// snapshots in unit tests. Unwritten addresses read as zero, matching
    /// the "unreadable memory is zero" contract.
    pub struct VecReader {
        pointer_width: PointerWidth,
        bytes: Mutex<HashMap<u64, u8>>,
        version: Mutex<HashMap<u64, VersionInfo>>,
    }

    impl VecReader {
        #[must_use]
        pub fn new(pointer_width: PointerWidth) -> Self {
            Self {
                pointer_width,
                bytes: Mutex::new(HashMap::new()),
                version: Mutex::new(HashMap::new()),
            }
        }

        pub fn write_u32(&mut self, addr: u64, value: u32) {
            let mut bytes = self.bytes.lock().unwrap();
            for (i, b) in value.to_le_bytes().iter().enumerate() {
                bytes.insert(addr + i as u64, *b);
            }
        }

        pub fn write_u64(&mut self, addr: u64, value: u64) {
            let mut bytes = self.bytes.lock().unwrap();
            for (i, b) in value.to_le_bytes().iter().enumerate() {
                bytes.insert(addr + i as u64, *b);
            }
        }

        pub fn write_pointer(&mut self, addr: u64, value: u64) {
            match self.pointer_width {
                PointerWidth::Bits32 => self.write_u32(addr, value as u32),
                PointerWidth::Bits64 => self.write_u64(addr, value),
            }
        }

        pub fn set_version(&mut self, base: u64, version: VersionInfo) {
            self.version.lock().unwrap().insert(base, version);
        }
    }

    impl DataReader for VecReader {
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
                // Wholly unmapped: a failed read, not a legitimate all-zero value.
                return Vec::new();
            }
            (0..len as u64)
                .map(|i| bytes.get(&(addr + i)).copied().unwrap_or(0))
                .collect()
        }

        fn get_version_info(&self, base: u64) -> Option<VersionInfo> {
            self.version.lock().unwrap().get(&base).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::VecReader;
    use super::*;

    #[test]
    fn read_pointer_widens_32_bit() {
        let mut reader = VecReader::new(PointerWidth::Bits32);
        reader.write_pointer(0x100, 0xdead_beef);
        assert_eq!(reader.read_pointer(0x100), 0xdead_beef);
    }

    #[test]
    fn read_pointer_64_bit() {
        let mut reader = VecReader::new(PointerWidth::Bits64);
        reader.write_pointer(0x100, 0x1122_3344_5566_7788);
        assert_eq!(reader.read_pointer(0x100), 0x1122_3344_5566_7788);
    }

    #[test]
    fn unreadable_address_is_zero() {
        let reader = VecReader::new(PointerWidth::Bits64);
        assert_eq!(reader.read_pointer(0xffff), 0);
        assert_eq!(reader.read_u32(0xffff), None);
    }
}
