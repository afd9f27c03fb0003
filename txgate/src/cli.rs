use std::path::PathBuf;

use clap::Parser;

use txgate::{ConfigError, FrameTemplate, TransmitOptions, DEFAULT_MAX_IN_FLIGHT};

#[derive(Debug, Parser)]
#[command(
    name = "txgate",
    version,
    about = "Send raw Ethernet frames with a bounded number of frames in flight"
)]
pub(crate) struct Cli {
    /// Interface to transmit on
    #[arg(short, long, default_value = "eth0")]
    pub(crate) iface: String,

    /// Number of frames to send, 0 to send until interrupted
    #[arg(short = 'n', long, default_value_t = 0)]
    pub(crate) count: u64,

    /// Maximum number of frames submitted and not yet completed
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub(crate) max_in_flight: usize,

    /// File holding the complete frame to send, Ethernet header included. Defaults to an
    /// ICMP echo reply.
    #[arg(long, value_name = "FILE")]
    pub(crate) template: Option<PathBuf>,
}

impl Cli {
    pub(crate) fn options(&self) -> TransmitOptions {
        TransmitOptions::default().with_max_in_flight(self.max_in_flight).with_count(self.count)
    }

    pub(crate) fn load_template(&self) -> Result<FrameTemplate, ConfigError> {
        let Some(path) = &self.template else {
            return Ok(FrameTemplate::default());
        };

        let frame = std::fs::read(path)
            .map_err(|source| ConfigError::TemplateFile { path: path.clone(), source })?;

        Ok(FrameTemplate::new(frame)?)
    }
}
