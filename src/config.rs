//! Configuration Module - Heapwalk Tuning Parameters
//!
//! Manages the handful of parameters that are actually tunable per the
//! spec. The core owns no persisted state: no env vars, no config files,
//! no CLI. A host constructs a [`HeapWalkConfig`] in-process and hands it
//! to [`crate::heap::Heap::new`].

use crate::error::{HeapError, Result};

/// Configuration for a [`crate::heap::Heap`].
///
/// # Examples
///
/// ```
/// use heapwalk::config::HeapWalkConfig;
///
/// let config = HeapWalkConfig::default();
/// assert!(config.validate().is_ok());
///
/// let config = HeapWalkConfig {
///     diagnostic_buffer_len: 4096,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HeapWalkConfig {
    /// Size, in bytes, at and above which an object on a small-object
    /// segment is considered corrupt (§4.6.3, §4.1). The large-object heap
    /// itself is exempt from this check.
    ///
    /// Default: `85_000` (the large-object threshold named in the spec's
    /// GLOSSARY).
    pub large_object_threshold: usize,

    /// Length of the per-thread diagnostic ring buffer enabled by
    /// [`crate::diagnostics::log_heap_walk_steps`]. Zero disables the
    /// facility (the default) at zero cost.
    ///
    /// Default: `0` (disabled).
    pub diagnostic_buffer_len: usize,
}

impl Default for HeapWalkConfig {
    fn default() -> Self {
        Self {
            large_object_threshold: 85_000,
            diagnostic_buffer_len: 0,
        }
    }
}

impl HeapWalkConfig {
    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::Configuration`] if `large_object_threshold` is
    /// zero (every object would be "corrupt" on a small-object segment).
    pub fn validate(&self) -> Result<()> {
        if self.large_object_threshold == 0 {
            return Err(HeapError::Configuration(
                "large_object_threshold must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
