//! Error Module - Heapwalk Error Types
//!
//! Defines the error types raised by this crate. Per the error-handling
//! design, data-quality problems observed while walking a snapshot (corrupt
//! segment bounds, unreadable memory, unknown method tables) are never
//! surfaced as errors here — they truncate or bound the affected stream
//! silently. This enum exists only for invalid-argument and boundary-misuse
//! cases, which are programming errors fatal to the call but never to the
//! process.

use thiserror::Error;

/// Main error type for all heapwalk operations.
#[derive(Debug, Error)]
pub enum HeapError {
    /// A caller passed a null/invalid type descriptor where one was required.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A segment passed to the allocation-context skipper was null or degenerate.
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// The heap was asked to operate with no segments, or other construction
    /// invariant was violated by the caller.
    #[error("heap construction failed: {0}")]
    HeapConstruction(String),

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Result type alias for heapwalk operations.
pub type Result<T> = std::result::Result<T, HeapError>;
