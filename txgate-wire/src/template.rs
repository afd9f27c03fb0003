use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::ETH_HLEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is {0} bytes, shorter than an Ethernet header ({ETH_HLEN} bytes)")]
    TooShort(usize),
}

/// ICMP echo reply captured on a live interface, used as the default template.
#[rustfmt::skip]
static ICMP_ECHO_REPLY: [u8; 98] = [
    // ethernet: dst, src, ethertype (IPv4)
    0x0a, 0x00, 0x27, 0x00, 0x00, 0x00,
    0x08, 0x00, 0x27, 0x98, 0xa0, 0xea,
    0x08, 0x00,
    // ipv4: ihl 5, total length 84, ttl 64, proto ICMP
    0x45, 0x00, 0x00, 0x54,
    0xdc, 0x5a, 0x00, 0x00,
    0x40, 0x01, 0xac, 0xf2,
    0xc0, 0xa8, 0x38, 0x0a, // 192.168.56.10
    0xc0, 0xa8, 0x38, 0x01, // 192.168.56.1
    // icmp: echo reply, id 0x0780, seq 10
    0x00, 0x00, 0xf8, 0x17,
    0x07, 0x80, 0x00, 0x0a,
    // echo data
    0x94, 0x89, 0x16, 0x52, 0x00, 0x00, 0x00, 0x00,
    0x8d, 0xaf, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27,
    0x28, 0x29, 0x2a, 0x2b, 0x2c, 0x2d, 0x2e, 0x2f,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
];

/// An immutable, complete link-layer frame (Ethernet header + payload) that every
/// [`PacketBuffer`](crate::PacketBuffer) is filled from.
///
/// Cloning is cheap: all clones share the same read-only storage.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameTemplate {
    frame: Bytes,
}

impl FrameTemplate {
    /// Creates a template from a full frame. The frame must at least hold an Ethernet header,
    /// its content is not inspected otherwise.
    pub fn new(frame: impl Into<Bytes>) -> Result<Self, TemplateError> {
        let frame = frame.into();
        if frame.len() < ETH_HLEN {
            return Err(TemplateError::TooShort(frame.len()));
        }

        Ok(Self { frame })
    }

    /// The built-in ICMP echo reply frame.
    pub fn icmp_echo_reply() -> Self {
        Self { frame: Bytes::from_static(&ICMP_ECHO_REPLY) }
    }

    /// Total frame length in bytes, header included.
    #[inline]
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.frame
    }

    /// The Ethernet header of the frame.
    pub fn header(&self) -> &[u8] {
        &self.frame[..ETH_HLEN]
    }

    /// Everything after the Ethernet header.
    pub fn payload(&self) -> &[u8] {
        &self.frame[ETH_HLEN..]
    }

    /// The EtherType field of the Ethernet header.
    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([self.frame[12], self.frame[13]])
    }
}

impl Default for FrameTemplate {
    fn default() -> Self {
        Self::icmp_echo_reply()
    }
}

impl AsRef<[u8]> for FrameTemplate {
    fn as_ref(&self) -> &[u8] {
        &self.frame
    }
}

impl fmt::Debug for FrameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameTemplate")
            .field("len", &self.len())
            .field("ethertype", &format_args!("{:#06x}", self.ethertype()))
            .finish()
    }
}
