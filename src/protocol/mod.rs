//! Protocol module - wire constants, marker scanning, framing, checksum.
//!
//! This module implements the server-to-client side of the exchange:
//! - Marker scanner draining the ring buffer
//! - Frame decoder stitching residual bytes to raw stream reads
//! - Frame struct and payload checksum

mod frame;
mod frame_decoder;
mod scanner;
mod wire_format;

pub use frame::{checksum, Frame};
pub use frame_decoder::FrameDecoder;
pub use scanner::{
    scan_stream, scan_stream_with_abort, MarkerScanner, ScanLimits, ScanReport,
    DEFAULT_MAX_PREAMBLE, DEFAULT_SCAN_TIMEOUT,
};
pub use wire_format::{
    encode_checksum_line, frame_size, trim_line_ending, CHECKSUM_PREFIX, GREETING,
    LENGTH_PREFIX_SIZE, MARKER, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, TRAILER_SIZE,
};
