use std::sync::atomic::{AtomicU64, Ordering};

/// Transmit statistics, shared between the worker task, in-flight frames and the
/// [`Transmitter`](crate::Transmitter).
#[derive(Debug, Default)]
pub struct TransmitStats {
    /// Frames accepted by the interface
    sent: AtomicU64,
    /// Frames completed by the interface
    completed: AtomicU64,
    /// Frames rejected by the interface
    rejected: AtomicU64,
    alloc_failures: AtomicU64,
    store_failures: AtomicU64,
    /// Completions received for frames that had already completed
    duplicate_completions: AtomicU64,
}

impl TransmitStats {
    /// Increments the sent counter and returns the new total.
    #[inline]
    pub(crate) fn increment_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub(crate) fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_alloc_failures(&self) {
        self.alloc_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_duplicate_completions(&self) {
        self.duplicate_completions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alloc_failures(&self) -> u64 {
        self.alloc_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn duplicate_completions(&self) -> u64 {
        self.duplicate_completions.load(Ordering::Relaxed)
    }

    /// A point-in-time copy of all counters.
    pub fn snapshot(&self) -> ShutdownReport {
        ShutdownReport {
            sent: self.sent(),
            completed: self.completed(),
            rejected: self.rejected(),
            alloc_failures: self.alloc_failures(),
            store_failures: self.store_failures(),
            duplicate_completions: self.duplicate_completions(),
        }
    }
}

/// Final counters, reported once the transmitter has shut down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub sent: u64,
    pub completed: u64,
    pub rejected: u64,
    pub alloc_failures: u64,
    pub store_failures: u64,
    pub duplicate_completions: u64,
}
