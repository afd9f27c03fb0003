use std::collections::TryReserveError;

use bytes::Bytes;
use thiserror::Error;

use crate::{FrameTemplate, ETH_HLEN};

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("packet buffer size overflows usize")]
    Overflow,
    #[error("failed to allocate {size} bytes: {source}")]
    Reserve {
        size: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot store {len} bytes at offset {offset}: data area is {data_len} bytes")]
pub struct StoreError {
    pub offset: usize,
    pub len: usize,
    pub data_len: usize,
}

/// An owned frame buffer with reserved space in front of (headroom) and behind (tailroom)
/// the data area.
///
/// ```text
/// 0          data            tail          capacity
/// | headroom | ... frame ... | tailroom    |
/// ```
///
/// The data area only ever grows into the reserved space: [`put`](Self::put) extends it at the
/// tail, [`push`](Self::push) extends it at the head.
#[derive(Debug)]
pub struct PacketBuffer {
    buf: Vec<u8>,
    /// Start of the data area.
    data: usize,
    /// End of the data area.
    tail: usize,
    /// Offset of the link-layer header.
    mac_header: usize,
    /// Offset of the network-layer header.
    network_header: usize,
}

impl PacketBuffer {
    /// Allocates a zeroed buffer of `size` bytes with an empty data area at offset 0.
    ///
    /// Allocation is fallible: running out of memory is reported instead of aborting.
    pub fn alloc(size: usize) -> Result<Self, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|source| AllocError::Reserve { size, source })?;
        buf.resize(size, 0);

        Ok(Self { buf, data: 0, tail: 0, mac_header: 0, network_header: 0 })
    }

    /// Allocates a buffer laid out for `template` on an interface that needs `headroom` bytes
    /// of link-layer reservation and `tailroom` bytes of trailing padding.
    ///
    /// At least [`ETH_HLEN`] bytes are reserved in front so the Ethernet header always fits.
    /// The data area spans exactly the template length, with the MAC and network headers set.
    /// Content is not copied; call [`store`](Self::store) for that.
    pub fn for_template(
        template: &FrameTemplate,
        headroom: usize,
        tailroom: usize,
    ) -> Result<Self, AllocError> {
        let reserved = headroom.max(ETH_HLEN);
        let body = template.len() - ETH_HLEN;
        let size = (reserved - ETH_HLEN)
            .checked_add(template.len())
            .and_then(|n| n.checked_add(tailroom))
            .ok_or(AllocError::Overflow)?;

        let mut buffer = Self::alloc(size)?;
        buffer.reserve(reserved);
        buffer.reset_network_header();
        buffer.put(body);
        buffer.push(ETH_HLEN);
        buffer.reset_mac_header();

        Ok(buffer)
    }

    /// Moves an empty data area `len` bytes forward, growing the headroom.
    ///
    /// # Panics
    ///
    /// Panics if the data area is not empty or if `len` exceeds the tailroom.
    pub fn reserve(&mut self, len: usize) {
        assert!(self.is_empty(), "reserve on a non-empty packet buffer");
        assert!(len <= self.tailroom(), "reserve of {len} bytes exceeds tailroom");
        self.data += len;
        self.tail += len;
    }

    /// Extends the data area by `len` bytes at the tail and returns the new bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the tailroom.
    pub fn put(&mut self, len: usize) -> &mut [u8] {
        assert!(len <= self.tailroom(), "put of {len} bytes exceeds tailroom");
        let start = self.tail;
        self.tail += len;
        &mut self.buf[start..self.tail]
    }

    /// Extends the data area by `len` bytes at the head and returns the new bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the headroom.
    pub fn push(&mut self, len: usize) -> &mut [u8] {
        assert!(len <= self.headroom(), "push of {len} bytes exceeds headroom");
        self.data -= len;
        &mut self.buf[self.data..self.data + len]
    }

    /// Marks the current start of the data area as the link-layer header.
    pub fn reset_mac_header(&mut self) {
        self.mac_header = self.data;
    }

    /// Marks the current start of the data area as the network-layer header.
    pub fn reset_network_header(&mut self) {
        self.network_header = self.data;
    }

    /// Copies `src` into the data area at `offset`. Fails without writing anything if it
    /// does not fit.
    pub fn store(&mut self, offset: usize, src: &[u8]) -> Result<(), StoreError> {
        if offset.checked_add(src.len()).map_or(true, |end| end > self.len()) {
            return Err(StoreError { offset, len: src.len(), data_len: self.len() });
        }

        let start = self.data + offset;
        self.buf[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// The data area.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf[self.data..self.tail]
    }

    /// The data area from the link-layer header on.
    pub fn mac_header(&self) -> &[u8] {
        &self.buf[self.mac_header..self.tail]
    }

    /// The data area from the network-layer header on.
    pub fn network_header(&self) -> &[u8] {
        &self.buf[self.network_header..self.tail]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tail - self.data
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail == self.data
    }

    #[inline]
    pub fn headroom(&self) -> usize {
        self.data
    }

    #[inline]
    pub fn tailroom(&self) -> usize {
        self.buf.len() - self.tail
    }

    /// Total allocated size.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Converts the data area into [`Bytes`] without copying.
    pub fn freeze(mut self) -> Bytes {
        self.buf.truncate(self.tail);
        Bytes::from(self.buf).slice(self.data..)
    }
}
