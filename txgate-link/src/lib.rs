#![doc(issue_tracker_base_url = "https://github.com/txgate/txgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::io;

use thiserror::Error;

use txgate_wire::ETH_HLEN;

pub mod datalink;

mod frame;
pub use frame::*;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("interface not found: {0}")]
    NotFound(String),
    #[error("interface {0} does not provide an Ethernet channel")]
    Unsupported(String),
    #[error("failed to open channel on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Why an interface refused a frame.
#[derive(Debug, Error)]
pub enum RejectReason {
    #[error("transmit queue congested")]
    Congested,
    #[error("frame dropped by interface")]
    Dropped,
    #[error("interface closed")]
    Closed,
    #[error("IO error: {0:?}")]
    Io(#[from] io::Error),
}

/// A frame the interface did not accept. The frame is handed back to the submitter, and its
/// completion has not fired.
#[derive(Debug, Error)]
#[error("frame rejected: {reason}")]
pub struct Rejected {
    frame: Frame,
    #[source]
    reason: RejectReason,
}

impl Rejected {
    pub fn new(frame: Frame, reason: RejectReason) -> Self {
        Self { frame, reason }
    }

    pub fn reason(&self) -> &RejectReason {
        &self.reason
    }

    pub fn into_parts(self) -> (Frame, RejectReason) {
        (self.frame, self.reason)
    }
}

/// A resolved network interface that frames can be submitted to.
pub trait Interface: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Bytes the link layer needs in front of the frame data.
    fn required_headroom(&self) -> usize {
        ETH_HLEN
    }

    /// Bytes the link layer needs behind the frame data.
    fn required_tailroom(&self) -> usize {
        0
    }

    /// Hands a frame to the network stack.
    ///
    /// On `Ok` the interface owns the frame and must complete it eventually, either through
    /// [`Completion::complete`] or simply by dropping the frame. On `Err` the frame is returned
    /// uncompleted.
    fn submit(&self, frame: Frame) -> Result<(), Rejected>;
}

/// Looks up interfaces by name.
pub trait Resolver {
    type Interface: Interface;

    fn resolve(&self, name: &str) -> Result<Self::Interface, ResolveError>;
}
