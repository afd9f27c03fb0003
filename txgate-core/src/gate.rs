use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use txgate_link::{Completion, CompletionSink, CompletionState};

use crate::TransmitStats;

/// Admission control for frames in flight.
///
/// Holds a counter in `0..=max_in_flight`. [`acquire`](Gate::acquire) takes a slot, waiting
/// for one to free up if needed; [`release`](Gate::release) gives one back and wakes every
/// waiter. Release is safe to call from any thread.
#[derive(Debug)]
pub struct Gate {
    in_flight: AtomicUsize,
    max_in_flight: usize,
    notify: Notify,
}

impl Gate {
    /// Creates a gate admitting at most `max_in_flight` frames at once.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight` is zero.
    pub fn new(max_in_flight: usize) -> Self {
        assert!(max_in_flight > 0, "gate must admit at least one frame");
        Self { in_flight: AtomicUsize::new(0), max_in_flight, notify: Notify::new() }
    }

    #[inline]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Takes a slot if one is free, without waiting.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let max = self.max_in_flight;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Permit { gate: Arc::clone(self), armed: false })
    }

    /// Takes a slot, waiting until one is free. Returns `None` if `stop` is cancelled before a
    /// slot could be taken.
    ///
    /// # Cancel Safety
    ///
    /// This method is cancel safe: if the future is dropped before completing, no slot is taken.
    pub async fn acquire(self: &Arc<Self>, stop: &CancellationToken) -> Option<Permit> {
        loop {
            // Register for wake-ups before checking, so a release in between is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if stop.is_cancelled() {
                return None;
            }

            if let Some(permit) = self.try_acquire() {
                return Some(permit);
            }

            tokio::select! {
                biased;
                _ = stop.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Gives a slot back and wakes all waiters.
    pub fn release(&self) {
        let released =
            self.in_flight.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        if released.is_err() {
            tracing::error!("released a slot on an empty gate, ignoring");
        }

        self.notify.notify_waiters();
    }

    /// Waits until no frames are in flight.
    pub async fn drained(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// An admitted slot for one frame. Dropping it unused gives the slot back.
#[derive(Debug)]
#[must_use = "dropping a permit releases its slot"]
pub struct Permit {
    gate: Arc<Gate>,
    armed: bool,
}

impl Permit {
    /// Hands the slot over to a frame completion: from now on the slot is released when the
    /// frame completes or is rolled back, exactly once.
    pub fn arm(mut self, stats: Arc<TransmitStats>) -> Completion {
        self.armed = true;
        Completion::new(InFlightSlot { gate: Arc::clone(&self.gate), stats })
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.armed {
            self.gate.release();
        }
    }
}

/// The gate slot held by a frame in flight.
struct InFlightSlot {
    gate: Arc<Gate>,
    stats: Arc<TransmitStats>,
}

impl CompletionSink for InFlightSlot {
    fn release(&self, outcome: CompletionState) {
        if outcome == CompletionState::Completed {
            self.stats.increment_completed();
        }
        self.gate.release();
    }

    fn duplicate(&self) {
        self.stats.increment_duplicate_completions();
    }
}
