#![doc(issue_tracker_base_url = "https://github.com/txgate/txgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::{io, path::PathBuf, sync::Arc};

use thiserror::Error;
use tokio::{runtime::TryCurrentError, task::JoinError};
use tokio_util::sync::CancellationToken;

use txgate_link::ResolveError;
use txgate_wire::TemplateError;

mod gate;
pub use gate::*;

mod stats;
pub use stats::*;

mod transmitter;
pub use transmitter::*;

mod worker;
pub use worker::WorkerState;
use worker::WorkerStatus;

/// The default cap on frames submitted and not yet completed.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interface name must not be empty")]
    EmptyInterfaceName,
    #[error("max in-flight frames must be at least 1")]
    ZeroInFlight,
    #[error("invalid frame template: {0}")]
    Template(#[from] TemplateError),
    #[error("failed to read frame template {path:?}: {source}")]
    TemplateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to spawn transmit worker: {0}")]
    WorkerSpawn(#[source] TryCurrentError),
    #[error("Transmit worker failed: {0}")]
    WorkerJoin(#[from] JoinError),
}

#[derive(Debug, Clone)]
pub struct TransmitOptions {
    /// The maximum number of frames that have been submitted but not completed.
    pub max_in_flight: usize,
    /// The number of frames to send. Zero sends until the transmitter is shut down.
    pub count: u64,
}

impl TransmitOptions {
    /// Sets the maximum number of frames in flight.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Sets the number of frames to send, `0` for no limit.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// The number of frames to send, if bounded.
    pub fn target(&self) -> Option<u64> {
        (self.count > 0).then_some(self.count)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }

        Ok(())
    }
}

impl Default for TransmitOptions {
    fn default() -> Self {
        Self { max_in_flight: DEFAULT_MAX_IN_FLIGHT, count: 0 }
    }
}

/// The transmitter state, shared between the worker task and the [`Transmitter`].
#[derive(Debug)]
pub(crate) struct TransmitContext {
    pub(crate) gate: Arc<Gate>,
    pub(crate) stats: Arc<TransmitStats>,
    pub(crate) state: WorkerStatus,
    /// Cancelled to ask the worker to stop.
    pub(crate) stop: CancellationToken,
    /// Cancelled by the worker once it has exited.
    pub(crate) stopped: CancellationToken,
}

impl TransmitContext {
    pub(crate) fn new(max_in_flight: usize) -> Self {
        Self {
            gate: Arc::new(Gate::new(max_in_flight)),
            stats: Arc::new(TransmitStats::default()),
            state: WorkerStatus::default(),
            stop: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }
}
