//! Decoded frame and payload checksum.
//!
//! # Example
//!
//! ```
//! use sumwire_client::protocol::{checksum, Frame};
//!
//! let frame = Frame::from_wire(&[3, 10, 20, 30, b'0', b'\n']).unwrap();
//! assert_eq!(frame.payload(), &[10, 20, 30]);
//! assert_eq!(frame.checksum(), 60);
//! assert_eq!(checksum(&[255, 255]), 510);
//! ```

use bytes::Bytes;

use super::wire_format::{frame_size, LENGTH_PREFIX_SIZE, TRAILER_SIZE};

/// A complete length-prefixed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes; its length equals the wire length prefix.
    pub payload: Bytes,
    /// Trailer bytes, kept as received.
    pub trailer: [u8; TRAILER_SIZE],
}

impl Frame {
    /// Build a frame from an exactly-sized wire buffer
    /// (`length | payload | trailer`), copying the payload.
    ///
    /// Returns `None` if the buffer size disagrees with its length byte.
    pub fn from_wire(wire: &[u8]) -> Option<Self> {
        Self::from_bytes(Bytes::copy_from_slice(wire))
    }

    /// Zero-copy variant of [`Frame::from_wire`]: the payload shares
    /// `wire`'s allocation.
    pub fn from_bytes(wire: Bytes) -> Option<Self> {
        let len = *wire.first()?;
        if wire.len() != frame_size(len) {
            return None;
        }
        let payload_end = LENGTH_PREFIX_SIZE + len as usize;
        let mut trailer = [0u8; TRAILER_SIZE];
        trailer.copy_from_slice(&wire[payload_end..]);
        Some(Self {
            payload: wire.slice(LENGTH_PREFIX_SIZE..payload_end),
            trailer,
        })
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length as announced by the prefix.
    #[inline]
    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Checksum of the payload.
    #[inline]
    pub fn checksum(&self) -> u32 {
        checksum(&self.payload)
    }
}

/// Sum of the bytes taken as unsigned values.
///
/// A `u32` cannot overflow: the largest payload sums to 255 * 255.
pub fn checksum(payload: &[u8]) -> u32 {
    payload.iter().map(|&b| u32::from(b)).sum()
}
