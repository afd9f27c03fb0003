#![doc(issue_tracker_base_url = "https://github.com/txgate/txgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Frame templates and the packet buffers built from them.

mod buffer;
pub use buffer::*;

mod template;
pub use template::*;

/// Length of an Ethernet II header: destination MAC, source MAC and EtherType.
pub const ETH_HLEN: usize = 14;

/// EtherType for IPv4.
pub const ETH_P_IP: u16 = 0x0800;
