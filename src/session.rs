//! One checksum exchange over an established stream.
//!
//! The session drives the connection through its states in order:
//!
//! ```text
//! Init → GreetingSent → ScanningMarker → DrainingResidual → FrameLengthKnown
//!      → FrameComplete → ChecksumSent → ResponseRead → Closed
//! ```
//!
//! Any failure jumps straight to `Closed` and the error is returned; nothing
//! is retried. Only `ScanningMarker` is multi-threaded (see
//! [`scan_stream_with_abort`]); every other step is a plain blocking read or
//! write on the calling thread.

use std::io::{BufRead, BufReader, Read, Write};

use serde::Serialize;

use crate::error::{Result, SumwireError};
use crate::protocol::{
    encode_checksum_line, scan_stream_with_abort, trim_line_ending, FrameDecoder, MarkerScanner,
    ScanLimits, GREETING, MARKER,
};
use crate::ring_buffer::{StreamRingBuffer, DEFAULT_CAPACITY};

/// Upper bound on the acknowledgement line.
pub const MAX_RESPONSE_LINE: u64 = 64 * 1024;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    GreetingSent,
    ScanningMarker,
    DrainingResidual,
    FrameLengthKnown,
    FrameComplete,
    ChecksumSent,
    ResponseRead,
    Closed,
}

/// Protocol parameters for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ring buffer capacity used while scanning.
    pub capacity: usize,
    pub greeting: Vec<u8>,
    pub marker: Vec<u8>,
    pub scan_limits: ScanLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            greeting: GREETING.to_vec(),
            marker: MARKER.to_vec(),
            scan_limits: ScanLimits::default(),
        }
    }
}

/// Summary of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Bytes before the marker.
    pub preamble_len: u64,
    /// Frame bytes already buffered when the scanner stopped.
    pub residual_len: usize,
    pub payload_len: u8,
    pub trailer: [u8; 2],
    pub checksum: u32,
    /// Server's final line, without its line ending.
    pub response: String,
}

/// Wakes a read blocked on the session's stream.
type Interrupt = Box<dyn Fn() + Send>;

/// State machine for one exchange over `S`.
pub struct Session<S> {
    stream: S,
    config: SessionConfig,
    state: SessionState,
    history: Vec<SessionState>,
    interrupt: Option<Interrupt>,
}

impl<S: Read + Write + Send> Session<S> {
    pub fn new(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            config,
            state: SessionState::Init,
            history: vec![SessionState::Init],
            interrupt: None,
        }
    }

    /// Hook that unblocks a read parked on the stream, such as
    /// [`interrupt_handle`](crate::transport::interrupt_handle) for a socket.
    ///
    /// Called when scanning fails while the producer is still reading, so
    /// the scan deadline holds even without a socket read timeout.
    pub fn with_interrupt(mut self, interrupt: impl Fn() + Send + 'static) -> Self {
        self.interrupt = Some(Box::new(interrupt));
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Get a reference to the underlying stream.
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Consume the session and return the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Run the exchange to completion. The session ends `Closed` either way.
    pub fn run(&mut self) -> Result<Exchange> {
        if self.state != SessionState::Init {
            return Err(SumwireError::ConnectionClosed);
        }

        let result = self.exchange();
        if let Err(e) = &result {
            tracing::error!(state = ?self.state, "exchange failed: {}", e);
        }
        self.transition(SessionState::Closed);
        result
    }

    fn exchange(&mut self) -> Result<Exchange> {
        let greeting = self.config.greeting.clone();
        self.send(&greeting)?;
        self.transition(SessionState::GreetingSent);

        self.transition(SessionState::ScanningMarker);
        let ring = StreamRingBuffer::new(self.config.capacity);
        let scanner = MarkerScanner::new(&self.config.marker);
        let interrupt = &self.interrupt;
        let report = scan_stream_with_abort(
            &mut self.stream,
            &ring,
            &scanner,
            &self.config.scan_limits,
            || {
                if let Some(interrupt) = interrupt {
                    interrupt();
                }
            },
        )?;

        self.transition(SessionState::DrainingResidual);
        let residual = ring.drain_residual();
        tracing::debug!(
            preamble = report.preamble_len,
            residual = residual.len(),
            "marker found"
        );

        let mut decoder = FrameDecoder::new(&residual);
        decoder.read_length(&mut self.stream)?;
        self.transition(SessionState::FrameLengthKnown);

        let frame = decoder.finish(&mut self.stream)?;
        self.transition(SessionState::FrameComplete);

        let checksum = frame.checksum();
        self.send(&encode_checksum_line(checksum))?;
        self.transition(SessionState::ChecksumSent);

        let response = self.read_response()?;
        self.transition(SessionState::ResponseRead);

        Ok(Exchange {
            preamble_len: report.preamble_len,
            residual_len: residual.len(),
            payload_len: frame.len(),
            trailer: frame.trailer,
            checksum,
            response,
        })
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read one line, returned without validation.
    fn read_response(&mut self) -> Result<String> {
        let mut line = Vec::new();
        BufReader::new((&mut self.stream).take(MAX_RESPONSE_LINE)).read_until(b'\n', &mut line)?;
        if line.is_empty() {
            return Err(SumwireError::ConnectionClosed);
        }
        if line.len() as u64 == MAX_RESPONSE_LINE && !line.ends_with(b"\n") {
            return Err(SumwireError::ProtocolFormat(format!(
                "response line exceeds {MAX_RESPONSE_LINE} bytes"
            )));
        }
        Ok(String::from_utf8_lossy(trim_line_ending(&line)).into_owned())
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        self.history.push(next);
    }
}
