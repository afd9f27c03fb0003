use std::sync::Arc;

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info, warn};

use txgate_link::{Interface, Resolver};
use txgate_wire::FrameTemplate;

use crate::{
    worker::TransmitWorker, ConfigError, ShutdownReport, TransmitContext, TransmitError,
    TransmitOptions, TransmitStats, WorkerState,
};

/// A running transmitter: one worker task submitting frames to an interface, with at most
/// [`TransmitOptions::max_in_flight`] frames in flight.
///
/// ## Shutdown
/// [`shutdown`](Transmitter::shutdown) stops the worker, waits for it to exit, waits for every
/// frame in flight to complete and only then releases the interface. Dropping a transmitter
/// without shutting it down asks the worker to stop and runs the rest of the sequence on a
/// detached task.
#[derive(Debug)]
pub struct Transmitter<I: Interface> {
    /// State shared with the worker task.
    ctx: Arc<TransmitContext>,
    /// The worker task, until it has been joined.
    worker: Option<JoinHandle<()>>,
    /// The interface, until it has been released.
    interface: Option<Arc<I>>,
}

impl<I: Interface> Transmitter<I> {
    /// Resolves the interface called `name` and starts transmitting on it.
    pub fn start<R>(
        resolver: &R,
        name: &str,
        template: FrameTemplate,
        options: TransmitOptions,
    ) -> Result<Self, TransmitError>
    where
        R: Resolver<Interface = I>,
    {
        if name.is_empty() {
            return Err(ConfigError::EmptyInterfaceName.into());
        }
        options.validate()?;

        let interface = resolver.resolve(name)?;
        Self::spawn(interface, template, options)
    }

    /// Starts transmitting on an already resolved interface. Must be called from within a
    /// Tokio runtime.
    pub fn spawn(
        interface: I,
        template: FrameTemplate,
        options: TransmitOptions,
    ) -> Result<Self, TransmitError> {
        options.validate()?;

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                debug!(iface = interface.name(), "no runtime for the worker, releasing interface");
                drop(interface);
                return Err(TransmitError::WorkerSpawn(e));
            }
        };

        let ctx = Arc::new(TransmitContext::new(options.max_in_flight));
        let interface = Arc::new(interface);

        info!(
            iface = interface.name(),
            frame_len = template.len(),
            ethertype = %format_args!("{:#06x}", template.ethertype()),
            max_in_flight = options.max_in_flight,
            count = options.count,
            "starting transmitter"
        );

        let worker = TransmitWorker {
            ctx: Arc::clone(&ctx),
            interface: Arc::clone(&interface),
            template,
            target: options.target(),
        };

        let worker = runtime.spawn(worker.run());

        Ok(Self { ctx, worker: Some(worker), interface: Some(interface) })
    }

    pub fn stats(&self) -> &TransmitStats {
        &self.ctx.stats
    }

    /// The number of frames submitted and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.ctx.gate.in_flight()
    }

    pub fn max_in_flight(&self) -> usize {
        self.ctx.gate.max_in_flight()
    }

    pub fn state(&self) -> WorkerState {
        self.ctx.state.get()
    }

    /// The interface frames are submitted to.
    pub fn interface(&self) -> Option<&I> {
        self.interface.as_deref()
    }

    /// Waits for the worker to exit on its own, which only happens once the target count is
    /// reached. Frames may still be in flight when this returns.
    pub async fn finished(&self) {
        self.ctx.stopped.cancelled().await
    }

    /// Stops the worker, then drains and releases the interface.
    pub async fn shutdown(mut self) -> Result<ShutdownReport, TransmitError> {
        if self.ctx.state.request_stop() {
            debug!("stop requested");
        }
        self.ctx.stop.cancel();

        self.drain_and_release().await
    }

    /// Waits for the worker to reach its target, then drains and releases the interface.
    ///
    /// Never returns if the count is unbounded.
    pub async fn wait(mut self) -> Result<ShutdownReport, TransmitError> {
        self.drain_and_release().await
    }

    async fn drain_and_release(&mut self) -> Result<ShutdownReport, TransmitError> {
        let joined = match self.worker.take() {
            Some(worker) => worker.await,
            None => Ok(()),
        };

        if let Err(e) = &joined {
            error!(err = %e, "transmit worker failed");
        }

        let in_flight = self.in_flight();
        if in_flight > 0 {
            debug!(in_flight, "waiting for frames in flight to complete");
        }
        self.ctx.gate.drained().await;

        if let Some(interface) = self.interface.take() {
            debug!(
                iface = interface.name(),
                refs = Arc::strong_count(&interface),
                "releasing interface"
            );
            drop(interface);
        }

        let report = self.ctx.stats.snapshot();
        info!(
            rejected = report.rejected,
            duplicate_completions = report.duplicate_completions,
            "Sent {} frames",
            report.sent
        );

        joined?;
        Ok(report)
    }
}

impl<I: Interface> Drop for Transmitter<I> {
    fn drop(&mut self) {
        // Released already by `shutdown` or `wait`.
        let Some(interface) = self.interface.take() else { return };

        warn!(in_flight = self.in_flight(), "transmitter dropped without shutdown");
        self.ctx.state.request_stop();
        self.ctx.stop.cancel();

        let worker = self.worker.take();
        let ctx = Arc::clone(&self.ctx);

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    match worker {
                        Some(worker) => {
                            if let Err(e) = worker.await {
                                error!(err = %e, "transmit worker failed");
                            }
                        }
                        // A cancelled `wait` already took the handle.
                        None => ctx.stopped.cancelled().await,
                    }

                    ctx.gate.drained().await;
                    debug!(iface = interface.name(), "releasing interface of dropped transmitter");
                    drop(interface);
                });
            }
            Err(_) if ctx.state.get() == WorkerState::Stopped && ctx.gate.in_flight() == 0 => {
                drop(interface);
            }
            Err(_) => {
                error!(
                    iface = interface.name(),
                    in_flight = ctx.gate.in_flight(),
                    "no runtime to drain a dropped transmitter, leaking interface"
                );
                std::mem::forget(interface);
            }
        }
    }
}
