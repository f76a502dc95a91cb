//! Module Descriptor (C8)
//!
//! A snapshot of one loaded image: the immutable five the data-target
//! supplies at enumeration time (base, size, timestamp, file name,
//! virtual-ness), plus lazily computed version/managed-ness/PDB reference.
//! PE and ELF parsing is delegated to `goblin`, the crate closest example
//! repos reach for when reading a foreign image from a byte buffer rather
//! than the local filesystem (§14).

use crate::reader::{DataReader, VersionInfo};
use std::sync::OnceLock;

/// A reference to the PDB that produced a module's debug info, as carried
/// in the PE CodeView debug directory (RSDS record). Full MSF/PDB parsing
/// is out of scope (§6) — this only publishes what `pdb()` must expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbReference {
    pub path: String,
    pub guid: [u8; 16],
    pub age: u32,
}

/// Everything this crate learns by parsing one PE image, computed in a
/// single pass so no parsed `goblin` value needs to outlive the read.
struct PeImageSummary {
    is_managed: bool,
    pdb: Option<PdbReference>,
}

fn parse_pe_bytes(bytes: &[u8]) -> Option<PeImageSummary> {
    let parsed = match goblin::Object::parse(bytes) {
        Ok(object) => object,
        Err(e) => {
            log::warn!("failed to parse module image: {e}");
            return None;
        }
    };
    match parsed {
        goblin::Object::PE(pe) => {
            let is_managed = pe
                .header
                .optional_header
                .map(|oh| oh.data_directories.get_clr_runtime_header().is_some())
                .unwrap_or(false);
            let pdb = pe
                .debug_data
                .and_then(|debug| debug.codeview_pdb70_debug_info)
                .map(|cv| PdbReference {
                    path: String::from_utf8_lossy(cv.filename)
                        .trim_end_matches('\0')
                        .to_string(),
                    guid: cv.signature,
                    age: cv.age,
                });
            Some(PeImageSummary { is_managed, pdb })
        }
        // Managed assemblies always come down as PE images, even on a
        // Linux target reading a cross-compiled host; anything else
        // parses but carries no CLR header and no PDB reference.
        _ => Some(PeImageSummary {
            is_managed: false,
            pdb: None,
        }),
    }
}

/// One loaded image, as enumerated by the data-target (§3, §4.8).
#[derive(Debug)]
pub struct ModuleDescriptor {
    pub base: u64,
    /// PE `SizeOfImage`, used both as the read length for `get_pe_image`
    /// and for symbol-server lookup by the host.
    pub size: u32,
    pub timestamp: u32,
    pub file_name: Option<String>,
    /// Whether the image bytes are laid out as-loaded (section RVAs
    /// already relative to virtual addresses) rather than as-on-disk.
    pub is_virtual: bool,
    /// Linux `NT_GNU_BUILD_ID`, supplied by the data-target at construction.
    pub build_id: Option<Vec<u8>>,
    precomputed_version: Option<VersionInfo>,
    version: OnceLock<Option<VersionInfo>>,
    is_managed: OnceLock<bool>,
    pdb: OnceLock<Option<PdbReference>>,
}

impl ModuleDescriptor {
    #[must_use]
    pub fn new(
        base: u64,
        size: u32,
        timestamp: u32,
        file_name: Option<String>,
        is_virtual: bool,
        build_id: Option<Vec<u8>>,
    ) -> Self {
        Self {
            base,
            size,
            timestamp,
            file_name,
            is_virtual,
            build_id,
            precomputed_version: None,
            version: OnceLock::new(),
            is_managed: OnceLock::new(),
            pdb: OnceLock::new(),
        }
    }

    /// A descriptor with a version the data-target already knows, skipping
    /// the lazy `get_version_info` round trip entirely.
    #[must_use]
    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.precomputed_version = Some(version);
        self
    }

    /// Construct a PE image view by wrapping a windowed read over
    /// `[base, base + size)`. Returns `None` if the window could not be
    /// read at all or if the bytes don't parse as any image `goblin`
    /// recognizes. As a side effect, latches `is_managed` when not yet
    /// known (§4.8).
    fn pe_image(&self, reader: &dyn DataReader) -> Option<PeImageSummary> {
        let bytes = reader.read_bytes(self.base, self.size as usize);
        if bytes.is_empty() {
            log::debug!(
                "module image at {:#x} ({} bytes) could not be read",
                self.base,
                self.size
            );
            return None;
        }
        let summary = parse_pe_bytes(&bytes)?;
        let _ = self.is_managed.set(summary.is_managed);
        Some(summary)
    }

    /// Whether this module is a managed (CLR) image, computing it on
    /// demand via [`Self::pe_image`] if not already latched.
    #[must_use]
    pub fn is_managed(&self, reader: &dyn DataReader) -> bool {
        if let Some(&managed) = self.is_managed.get() {
            return managed;
        }
        match self.pe_image(reader) {
            Some(summary) => summary.is_managed,
            None => {
                let _ = self.is_managed.set(false);
                false
            }
        }
    }

    /// The default PDB reference from the PE image, or `None` if no image
    /// could be parsed. Latches once.
    #[must_use]
    pub fn pdb(&self, reader: &dyn DataReader) -> Option<PdbReference> {
        if let Some(existing) = self.pdb.get() {
            return existing.clone();
        }
        let result = self.pe_image(reader).and_then(|summary| summary.pdb);
        let _ = self.pdb.set(result.clone());
        result
    }

    /// The module's four-part version, from the constructor if supplied,
    /// otherwise from the data reader's version resource. Latches once.
    #[must_use]
    pub fn version(&self, reader: &dyn DataReader) -> Option<VersionInfo> {
        if let Some(v) = self.precomputed_version {
            return Some(v);
        }
        if let Some(&v) = self.version.get() {
            return v;
        }
        let v = reader.get_version_info(self.base);
        let _ = self.version.set(v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::PointerWidth;
    use crate::reader::test_support::VecReader;

    #[test]
    fn precomputed_version_never_touches_the_reader() {
        let module = ModuleDescriptor::new(0x1000, 0x2000, 0, None, false, None).with_version(VersionInfo {
            major: 1,
            minor: 2,
            build: 3,
            revision: 4,
        });
        let reader = VecReader::new(PointerWidth::Bits64);
        let version = module.version(&reader).unwrap();
        assert_eq!(version.major, 1);
        assert_eq!(version.revision, 4);
    }

    #[test]
    fn version_falls_back_to_reader_and_latches() {
        let mut reader = VecReader::new(PointerWidth::Bits64);
        reader.set_version(
            0x1000,
            VersionInfo {
                major: 9,
                minor: 0,
                build: 0,
                revision: 0,
            },
        );
        let module = ModuleDescriptor::new(0x1000, 0x2000, 0, None, false, None);
        assert_eq!(module.version(&reader).unwrap().major, 9);
        // Second call hits the latch, not the reader again, but the
        // reader has no way to signal that here; just confirm it's stable.
        assert_eq!(module.version(&reader).unwrap().major, 9);
    }

    #[test]
    fn unreadable_image_leaves_is_managed_false() {
        let reader = VecReader::new(PointerWidth::Bits64);
        let module = ModuleDescriptor::new(0xdead_0000, 0x1000, 0, None, false, None);
        assert!(!module.is_managed(&reader));
    }

    #[test]
    fn build_id_round_trips_through_the_constructor() {
        let module = ModuleDescriptor::new(0x1000, 0x2000, 0, Some("foo.dll".into()), false, Some(vec![1, 2, 3]));
        assert_eq!(module.build_id.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(module.file_name.as_deref(), Some("foo.dll"));
    }
}
