//! Interfaces backed by a raw [`pnet::datalink`] Ethernet channel.

use std::{fmt, io, time::Duration};

use parking_lot::Mutex;
use pnet::datalink::{self, Channel, DataLinkSender, NetworkInterface};
use tracing::{debug, warn};

use crate::{Frame, Interface, RejectReason, Rejected, ResolveError, Resolver};

/// Default size of the channel's write buffer, enough for a jumbo frame.
const DEFAULT_WRITE_BUFFER_SIZE: usize = 9216;

/// Default bound on how long a single write may block the submitting thread.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(10);

/// Resolves interface names against the host's interfaces and opens an Ethernet channel on
/// the match.
#[derive(Debug, Clone)]
pub struct DatalinkResolver {
    write_buffer_size: usize,
    write_timeout: Option<Duration>,
}

impl DatalinkResolver {
    pub fn new() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }

    /// Sets the write buffer size of the channels opened by this resolver.
    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Bounds how long a write may wait for the socket to become writable. A write that times
    /// out is rejected as [`RejectReason::Congested`]. `None` lets writes block indefinitely.
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

impl Default for DatalinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for DatalinkResolver {
    type Interface = DatalinkInterface;

    fn resolve(&self, name: &str) -> Result<Self::Interface, ResolveError> {
        let iface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;

        if !iface.is_up() {
            warn!(iface = name, "interface is down, frames may be dropped");
        }

        let config = datalink::Config {
            write_buffer_size: self.write_buffer_size,
            write_timeout: self.write_timeout,
            ..Default::default()
        };

        let tx = match datalink::channel(&iface, config) {
            Ok(Channel::Ethernet(tx, _rx)) => tx,
            Ok(_) => return Err(ResolveError::Unsupported(name.to_string())),
            Err(source) => return Err(ResolveError::Io { name: name.to_string(), source }),
        };

        debug!(iface = name, index = iface.index, mac = ?iface.mac, "opened datalink channel");

        Ok(DatalinkInterface { iface, tx: Mutex::new(tx) })
    }
}

/// An interface with an open Ethernet channel. Submitted frames are written synchronously and
/// complete as soon as the write returns.
///
/// A submit blocks the calling thread for up to the resolver's write timeout while the socket
/// is not writable.
pub struct DatalinkInterface {
    iface: NetworkInterface,
    tx: Mutex<Box<dyn DataLinkSender>>,
}

impl DatalinkInterface {
    pub fn index(&self) -> u32 {
        self.iface.index
    }
}

impl Interface for DatalinkInterface {
    fn name(&self) -> &str {
        &self.iface.name
    }

    fn submit(&self, frame: Frame) -> Result<(), Rejected> {
        let result = self.tx.lock().send_to(frame.data(), None);

        match result {
            // Dropping the frame completes it.
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(Rejected::new(frame, reject_reason(e))),
            None => Err(Rejected::new(frame, RejectReason::Dropped)),
        }
    }
}

/// Classifies a failed channel write.
fn reject_reason(e: io::Error) -> RejectReason {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RejectReason::Congested,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => RejectReason::Closed,
        _ => RejectReason::Io(e),
    }
}

impl fmt::Debug for DatalinkInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatalinkInterface")
            .field("name", &self.iface.name)
            .field("index", &self.iface.index)
            .field("mac", &self.iface.mac)
            .finish()
    }
}
