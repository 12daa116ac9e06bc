//! Frame assembly from scanner residue plus raw stream reads.
//!
//! When the scanner stops, the ring may already hold the first bytes of the
//! frame. Those bytes are placed at the front of the frame buffer and only
//! the remainder is read from the stream:
//!
//! ```text
//! residual:  [N][p0][p1]              (already buffered, never re-read)
//! stream:              [p2]..[pN-1][t0][t1]
//! frame:     [N][p0][p1][p2]..[pN-1][t0][t1]   = 1 + N + 2 bytes
//! ```
//!
//! With no residual the length byte itself is read from the stream first.

use std::io::{self, Read};

use bytes::BytesMut;

use super::frame::Frame;
use super::wire_format::{frame_size, LENGTH_PREFIX_SIZE};
use crate::error::{Result, SumwireError};

/// Two-step frame decoder: length first, then the rest.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Frame bytes gathered so far, starting with the length byte.
    buf: BytesMut,
    residual_len: usize,
    stream_bytes: usize,
}

impl FrameDecoder {
    /// Start a decoder seeded with residual bytes from the ring buffer.
    pub fn new(residual: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(residual.len().max(LENGTH_PREFIX_SIZE));
        buf.extend_from_slice(residual);
        Self {
            buf,
            residual_len: residual.len(),
            stream_bytes: 0,
        }
    }

    /// Decode a whole frame in one call.
    pub fn decode<R: Read + ?Sized>(residual: &[u8], stream: &mut R) -> Result<Frame> {
        let mut decoder = Self::new(residual);
        decoder.read_length(stream)?;
        decoder.finish(stream)
    }

    /// Number of residual bytes the decoder was seeded with.
    pub fn residual_len(&self) -> usize {
        self.residual_len
    }

    /// Bytes pulled from the stream so far.
    pub fn stream_bytes(&self) -> usize {
        self.stream_bytes
    }

    /// Length byte of the frame, reading it from `stream` if the residual
    /// was empty.
    pub fn read_length<R: Read + ?Sized>(&mut self, stream: &mut R) -> Result<u8> {
        if self.buf.is_empty() {
            let mut len = [0u8; LENGTH_PREFIX_SIZE];
            read_full(stream, &mut len)?;
            self.stream_bytes += LENGTH_PREFIX_SIZE;
            self.buf.extend_from_slice(&len);
        }
        Ok(self.buf[0])
    }

    /// Read the rest of the frame and return it.
    ///
    /// Reads exactly `N - offset + 3` bytes where `offset` is the number of
    /// frame bytes already held (`max(1, residual_len)`).
    ///
    /// # Errors
    ///
    /// `ShortRead` if the stream ends early; `ProtocolFormat` if the residual
    /// is longer than the whole frame.
    pub fn finish<R: Read + ?Sized>(mut self, stream: &mut R) -> Result<Frame> {
        let len = self.read_length(stream)?;
        let total = frame_size(len);
        let offset = self.buf.len();
        if offset > total {
            return Err(SumwireError::ProtocolFormat(format!(
                "{} bytes buffered past the marker but the frame is only {} bytes",
                offset, total
            )));
        }

        self.buf.resize(total, 0);
        read_full(stream, &mut self.buf[offset..])?;
        self.stream_bytes += total - offset;
        tracing::debug!(
            payload_len = len,
            residual = self.residual_len,
            from_stream = self.stream_bytes,
            "frame complete"
        );

        Frame::from_bytes(self.buf.freeze()).ok_or_else(|| {
            SumwireError::ProtocolFormat("frame size does not match its length byte".into())
        })
    }
}

/// Fill `buf` completely, tolerating reads split at any boundary.
///
/// Returns `ShortRead` with the count actually received if the stream ends
/// first.
pub(crate) fn read_full<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(SumwireError::ShortRead {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
