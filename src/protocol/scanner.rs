//! Marker scanning over the ring buffer.
//!
//! The scanner is the consumer side of [`StreamRingBuffer`]: it takes one
//! byte at a time, spinning while the ring is empty, until the marker has
//! been matched. Matched bytes are consumed and dropped. Whatever the
//! producer buffered past the marker stays in the ring as residual.
//!
//! Matching keeps a failure table, so a partial match that breaks falls
//! back to the longest marker prefix still in play instead of restarting
//! from zero. For markers without internal repetition (such as `RES`) this
//! is the same as a plain reset; `RRES` is still found at offset 1.

use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, SumwireError};
use crate::ring_buffer::StreamRingBuffer;

/// Default bound on preamble bytes before the marker.
pub const DEFAULT_MAX_PREAMBLE: u64 = 64 * 1024;

/// Default scan deadline.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle spins between deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 1024;

/// Bounds that keep a scan from spinning forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Maximum preamble bytes consumed before giving up.
    pub max_preamble: u64,
    /// Maximum wall time for the scan. `None` waits as long as the
    /// producer keeps the stream open.
    pub timeout: Option<Duration>,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_preamble: DEFAULT_MAX_PREAMBLE,
            timeout: Some(DEFAULT_SCAN_TIMEOUT),
        }
    }
}

/// Outcome of a successful scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Bytes that preceded the marker.
    pub preamble_len: u64,
}

/// Streaming matcher for one literal marker.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    marker: Vec<u8>,
    /// `fallback[i]`: longest proper prefix of `marker[..=i]` that is also
    /// its suffix.
    fallback: Vec<usize>,
}

impl MarkerScanner {
    pub fn new(marker: &[u8]) -> Self {
        let mut fallback = vec![0usize; marker.len()];
        let mut k = 0;
        for i in 1..marker.len() {
            while k > 0 && marker[i] != marker[k] {
                k = fallback[k - 1];
            }
            if marker[i] == marker[k] {
                k += 1;
            }
            fallback[i] = k;
        }
        Self {
            marker: marker.to_vec(),
            fallback,
        }
    }

    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    /// Feed one byte given the current match count; returns the new count.
    ///
    /// `matched` must be below the marker length.
    #[inline]
    pub fn advance(&self, mut matched: usize, byte: u8) -> usize {
        while matched > 0 && self.marker[matched] != byte {
            matched = self.fallback[matched - 1];
        }
        if self.marker[matched] == byte {
            matched + 1
        } else {
            0
        }
    }

    /// Consume bytes from `ring` until the marker is matched.
    ///
    /// The ring is halted on return, whether the marker was found or not.
    ///
    /// # Errors
    ///
    /// `MarkerNotFound` when the producer closes the stream with nothing left
    /// to scan, when the preamble exceeds `limits.max_preamble`, or when
    /// `limits.timeout` elapses.
    pub fn scan_until(&self, ring: &StreamRingBuffer, limits: &ScanLimits) -> Result<ScanReport> {
        let result = self.scan_inner(ring, limits);
        ring.halt();
        result
    }

    fn scan_inner(&self, ring: &StreamRingBuffer, limits: &ScanLimits) -> Result<ScanReport> {
        if self.marker.is_empty() {
            return Ok(ScanReport { preamble_len: 0 });
        }

        let started = Instant::now();
        let mut matched = 0usize;
        let mut consumed = 0u64;
        let mut idle = 0u32;

        loop {
            let Some(byte) = ring.try_take() else {
                if ring.is_closed() && ring.is_empty() {
                    return Err(SumwireError::MarkerNotFound {
                        reason: format!("stream ended after {consumed} bytes"),
                    });
                }
                idle = idle.wrapping_add(1);
                if idle % DEADLINE_CHECK_INTERVAL == 0 {
                    if let Some(timeout) = limits.timeout {
                        if started.elapsed() >= timeout {
                            return Err(SumwireError::MarkerNotFound {
                                reason: format!("no marker within {timeout:?}"),
                            });
                        }
                    }
                }
                std::hint::spin_loop();
                continue;
            };

            consumed += 1;
            matched = self.advance(matched, byte);
            if matched == self.marker.len() {
                return Ok(ScanReport {
                    preamble_len: consumed - matched as u64,
                });
            }
            if consumed - matched as u64 > limits.max_preamble {
                return Err(SumwireError::MarkerNotFound {
                    reason: format!("preamble exceeds {} bytes", limits.max_preamble),
                });
            }
        }
    }
}

/// Run the scanning phase: a producer thread feeds `ring` from `source`
/// while a scanner thread looks for the marker.
///
/// Both threads are joined before returning, so a read that was in flight
/// when the marker matched has published its bytes and the residual can be
/// drained from `ring` afterwards.
///
/// A producer parked in a read keeps this call waiting after the scanner
/// gives up. Use [`scan_stream_with_abort`] when `source` can be woken.
pub fn scan_stream<R: Read + Send + ?Sized>(
    source: &mut R,
    ring: &StreamRingBuffer,
    scanner: &MarkerScanner,
    limits: &ScanLimits,
) -> Result<ScanReport> {
    scan_stream_with_abort(source, ring, scanner, limits, || {})
}

/// Like [`scan_stream`], but calls `abort` when the scan fails while the
/// producer is still running. `abort` must make the pending read on
/// `source` return, for example by shutting the socket down.
pub fn scan_stream_with_abort<R, F>(
    source: &mut R,
    ring: &StreamRingBuffer,
    scanner: &MarkerScanner,
    limits: &ScanLimits,
    abort: F,
) -> Result<ScanReport>
where
    R: Read + Send + ?Sized,
    F: FnOnce(),
{
    thread::scope(|s| -> Result<ScanReport> {
        let producer = ring.producer();
        let producer_handle = thread::Builder::new()
            .name("sumwire-producer".into())
            .spawn_scoped(s, move || producer.run(source))?;
        let scanner_handle = match thread::Builder::new()
            .name("sumwire-scanner".into())
            .spawn_scoped(s, || scanner.scan_until(ring, limits))
        {
            Ok(handle) => handle,
            Err(e) => {
                ring.halt();
                abort();
                return Err(e.into());
            }
        };

        let scanned = scanner_handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        let aborted = scanned.is_err() && !ring.is_closed();
        if aborted {
            tracing::debug!("scan failed with the producer still reading, aborting");
            abort();
        }

        let produced = producer_handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        match (scanned, produced) {
            (Err(e), _) if aborted => Err(e),
            (_, Err(e)) => {
                tracing::warn!("stream read failed while scanning: {}", e);
                Err(SumwireError::Io(e))
            }
            (scanned, Ok(moved)) => {
                tracing::debug!(moved, "producer stopped");
                scanned
            }
        }
    })
}
