//! Observability Hook (§4.9)
//!
//! A process-wide, thread-local circular buffer of "heap walk steps".
//! Grounded on the structured event logging in `fgc::logging`, but
//! per-thread rather than a single shared `Mutex<Vec<_>>`: concurrent
//! walks must not contend with each other, and a heap walk produces far
//! too many steps for free-text logging to be useful.
//!
//! Disabled by default and zero-cost when disabled: [`record_step`] is a
//! single relaxed atomic load on the hot path.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One recorded step of a heap walk: `(object, method_table, base_size,
/// component_size, count)`.
///
/// A `base_size < 0` marks a corruption sentinel (§7): the allocation-context
/// skipper or the object enumerator detected non-progress, an overshoot, or
/// an oversize object and aborted the current scan. Every other field on a
/// sentinel record is best-effort context, not meaningful data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepRecord {
    pub object: u64,
    pub method_table: u64,
    pub base_size: i64,
    pub component_size: u32,
    pub count: u32,
}

impl StepRecord {
    /// A normal object step.
    #[must_use]
    pub const fn object(object: u64, method_table: u64, base_size: u64, component_size: u32, count: u32) -> Self {
        Self {
            object,
            method_table,
            base_size: base_size as i64,
            component_size,
            count,
        }
    }

    /// The distinguished corruption sentinel (§7): negative `base_size`.
    #[must_use]
    pub const fn corruption(object: u64) -> Self {
        Self {
            object,
            method_table: 0,
            base_size: -1,
            component_size: 0,
            count: 0,
        }
    }

    /// Whether this record is the corruption sentinel.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        self.base_size < 0
    }
}

/// `0` means disabled; any other value is the configured per-thread ring
/// buffer length.
static ENABLED_BUFFER_LEN: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static BUFFER: RefCell<RingBuffer> = RefCell::new(RingBuffer::new());
}

struct RingBuffer {
    records: Vec<StepRecord>,
    next: usize,
}

impl RingBuffer {
    const fn new() -> Self {
        Self {
            records: Vec::new(),
            next: 0,
        }
    }

    fn resize_if_needed(&mut self, len: usize) {
        if self.records.len() != len {
            self.records = vec![StepRecord::default(); len];
            self.next = 0;
        }
    }

    fn push(&mut self, step: StepRecord) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        self.records[self.next] = step;
        self.next = (self.next + 1) % len;
    }
}

/// Enable the diagnostic buffer process-wide with the given per-thread
/// capacity. Each thread lazily allocates its own buffer of this size on
/// first use; existing thread-local buffers resize on their next write.
pub fn log_heap_walk_steps(buffer_size: usize) {
    ENABLED_BUFFER_LEN.store(buffer_size, Ordering::SeqCst);
}

/// Disable the diagnostic buffer process-wide. Existing per-thread buffers
/// are not cleared, only stop accepting new writes.
pub fn disable_heap_walk_steps() {
    ENABLED_BUFFER_LEN.store(0, Ordering::SeqCst);
}

/// Whether the diagnostic buffer is currently enabled.
#[must_use]
pub fn is_enabled() -> bool {
    ENABLED_BUFFER_LEN.load(Ordering::Relaxed) != 0
}

/// Record one heap walk step into the calling thread's ring buffer. A
/// no-op, aside from the one atomic load, when disabled.
pub fn record_step(step: StepRecord) {
    let len = ENABLED_BUFFER_LEN.load(Ordering::Relaxed);
    if len == 0 {
        return;
    }
    BUFFER.with(|buf| {
        let mut buf = buf.borrow_mut();
        buf.resize_if_needed(len);
        buf.push(step);
    });
}

/// Record the corruption sentinel for `object` on the calling thread.
pub fn record_corruption(object: u64) {
    record_step(StepRecord::corruption(object));
}

/// Snapshot of the calling thread's most recent window of steps, oldest
/// first. Racy with respect to concurrent writes on the same thread from a
/// reentrant caller, which is the accepted tradeoff for a lock-free hot
/// path (§9 design notes).
#[must_use]
pub fn current_thread_steps() -> Vec<StepRecord> {
    BUFFER.with(|buf| buf.borrow().records.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test_helper::serial;

    // These tests share process-wide state (`ENABLED_BUFFER_LEN`), so they
    // run serialized via a simple in-crate mutex helper rather than relying
    // on test-harness ordering.
    mod serial_test_helper {
        use std::sync::Mutex;
        static LOCK: Mutex<()> = Mutex::new(());

        pub fn serial<F: FnOnce()>(f: F) {
            let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
            f();
        }
    }

    #[test]
    fn disabled_by_default_records_nothing() {
        serial(|| {
            disable_heap_walk_steps();
            record_step(StepRecord::object(1, 2, 24, 0, 0));
            assert!(current_thread_steps().is_empty());
        });
    }

    #[test]
    fn enabling_allocates_a_buffer_of_the_requested_size() {
        serial(|| {
            log_heap_walk_steps(4);
            record_step(StepRecord::object(1, 2, 24, 0, 0));
            assert_eq!(current_thread_steps().len(), 4);
            disable_heap_walk_steps();
        });
    }

    #[test]
    fn buffer_wraps_around() {
        serial(|| {
            log_heap_walk_steps(2);
            record_step(StepRecord::object(1, 1, 1, 0, 0));
            record_step(StepRecord::object(2, 2, 2, 0, 0));
            record_step(StepRecord::object(3, 3, 3, 0, 0));
            let steps = current_thread_steps();
            // Slot 0 was overwritten by the third record; slot 1 still
            // holds the second.
            assert_eq!(steps[0].object, 3);
            assert_eq!(steps[1].object, 2);
            disable_heap_walk_steps();
        });
    }

    #[test]
    fn corruption_sentinel_has_negative_base_size() {
        let step = StepRecord::corruption(0x1234);
        assert!(step.is_corruption());
        assert_eq!(step.object, 0x1234);
    }

    #[test]
    fn normal_step_is_not_corruption() {
        let step = StepRecord::object(0x1234, 0x5678, 24, 0, 0);
        assert!(!step.is_corruption());
    }
}
