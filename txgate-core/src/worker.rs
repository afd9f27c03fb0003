use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use tracing::{debug, error, trace};

use txgate_link::{Frame, Interface};
use txgate_wire::{FrameTemplate, PacketBuffer};

use crate::TransmitContext;

/// Lifecycle of the transmit worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Asked to stop; the worker has not exited yet.
    StopRequested,
    Stopped,
}

const RUNNING: u8 = 0;
const STOP_REQUESTED: u8 = 1;
const STOPPED: u8 = 2;

/// Atomic [`WorkerState`].
#[derive(Debug, Default)]
pub(crate) struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    pub(crate) fn get(&self) -> WorkerState {
        match self.0.load(Ordering::Acquire) {
            RUNNING => WorkerState::Running,
            STOP_REQUESTED => WorkerState::StopRequested,
            _ => WorkerState::Stopped,
        }
    }

    /// Moves a running worker to [`WorkerState::StopRequested`]. Returns `false` if it was not
    /// running.
    pub(crate) fn request_stop(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, STOP_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn set_stopped(&self) {
        self.0.store(STOPPED, Ordering::Release);
    }
}

/// The transmit worker. Builds frames from the template and submits them to the interface
/// until the target count is reached or it is asked to stop.
pub(crate) struct TransmitWorker<I: Interface> {
    pub(crate) ctx: Arc<TransmitContext>,
    pub(crate) interface: Arc<I>,
    pub(crate) template: FrameTemplate,
    /// Stop after this many frames were sent, if set.
    pub(crate) target: Option<u64>,
}

impl<I: Interface> TransmitWorker<I> {
    pub(crate) async fn run(self) {
        let _exit = ExitGuard(&self.ctx);

        let headroom = self.interface.required_headroom();
        let tailroom = self.interface.required_tailroom();
        debug!(
            iface = self.interface.name(),
            headroom,
            tailroom,
            target = ?self.target,
            "transmit worker started"
        );

        loop {
            // Admission and submission may never suspend when the interface keeps up.
            tokio::task::consume_budget().await;

            if self.ctx.stop.is_cancelled() {
                debug!("stop requested, exiting transmit worker");
                break;
            }

            let sent = self.ctx.stats.sent();
            if self.target.is_some_and(|target| sent >= target) {
                debug!(sent, "target reached, exiting transmit worker");
                break;
            }

            let Some(permit) = self.ctx.gate.acquire(&self.ctx.stop).await else {
                debug!("stop requested while waiting for a slot, exiting transmit worker");
                break;
            };

            let mut buffer = match PacketBuffer::for_template(&self.template, headroom, tailroom) {
                Ok(buffer) => buffer,
                Err(e) => {
                    error!(err = %e, "Couldn't allocate packet buffer");
                    self.ctx.stats.increment_alloc_failures();
                    drop(permit);
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            // `for_template` sizes the data area to the template, so this only trips if that
            // layout changes.
            if let Err(e) = buffer.store(0, self.template.as_ref()) {
                error!(err = %e, "Error storing frame to packet buffer");
                self.ctx.stats.increment_store_failures();
                drop(buffer);
                drop(permit);
                tokio::task::yield_now().await;
                continue;
            }

            let frame = Frame::new(buffer, permit.arm(Arc::clone(&self.ctx.stats)));

            match self.interface.submit(frame) {
                Ok(()) => {
                    let sent = self.ctx.stats.increment_sent();
                    trace!(sent, "frame submitted");
                }
                Err(rejected) => {
                    let (frame, reason) = rejected.into_parts();
                    error!(%reason, "Error sending frame");
                    self.ctx.stats.increment_rejected();
                    // No completion will come for a frame that was never accepted.
                    frame.rollback();
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}

/// Marks the worker stopped when it exits, including by panic.
struct ExitGuard<'a>(&'a TransmitContext);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.state.set_stopped();
        self.0.stopped.cancel();
    }
}
