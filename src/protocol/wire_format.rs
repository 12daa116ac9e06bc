//! Wire format constants and line encoding.
//!
//! ```text
//! client                                   server
//!   │ ── "HELLO\n" ─────────────────────────▶ │
//!   │ ◀── preamble … "RES" ┬──────┬─────┬──── │
//!   │                      │ N    │ N B │ 2 B │
//!   │                      │ u8   │ data│ trl │
//!   │ ── "SUM<decimal>\n" ──────────────────▶ │
//!   │ ◀── acknowledgement line ────────────── │
//! ```

/// Greeting sent right after connecting.
pub const GREETING: &[u8] = b"HELLO\n";

/// Marker that ends the preamble; the frame starts right after it.
pub const MARKER: &[u8] = b"RES";

/// Prefix of the checksum reply line.
pub const CHECKSUM_PREFIX: &str = "SUM";

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 1;

/// Size of the opaque trailer following the payload.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the length prefix can announce.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = LENGTH_PREFIX_SIZE + MAX_PAYLOAD_SIZE + TRAILER_SIZE;

/// Total frame size for a payload of `payload_len` bytes.
#[inline]
pub fn frame_size(payload_len: u8) -> usize {
    LENGTH_PREFIX_SIZE + payload_len as usize + TRAILER_SIZE
}

/// Encode the checksum reply line, e.g. `SUM60\n`.
pub fn encode_checksum_line(checksum: u32) -> Vec<u8> {
    format!("{CHECKSUM_PREFIX}{checksum}\n").into_bytes()
}

/// Strip one trailing `\n` or `\r\n` from a received line.
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
