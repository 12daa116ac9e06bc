//! Lock-free ring buffer bridging the socket reader and the marker scanner.
//!
//! Exactly one producer thread moves bytes from the stream into the buffer
//! and exactly one consumer thread takes them out again. No mutex is
//! involved; the two sides coordinate through two monotonic counters:
//!
//! ```text
//!   read_seq                write_seq
//!      │                        │
//!      ▼                        ▼
//! ─────┬────┬────┬────┬────┬─────
//!  ... │ r0 │ r1 │ r2 │ r3 │ ...      slot of absolute index i = i mod C
//! ─────┴────┴────┴────┴────┴─────
//! ```
//!
//! `write_seq` counts bytes published so far and `read_seq` counts bytes
//! consumed, so the fill level is `write_seq - read_seq` and always lies in
//! `0..=C`.
//!
//! # Memory ordering
//!
//! - The producer stores every slot of a fill, then advances `write_seq`
//!   with `Release`. The consumer loads `write_seq` with `Acquire` before it
//!   reads a slot, so an advanced counter always comes with its bytes.
//! - The consumer reads a slot, then advances `read_seq` with `Release`. The
//!   producer loads `read_seq` with `Acquire` before overwriting slots.
//! - `halted` and `closed` are set with `Release` and read with `Acquire`.
//!
//! Slots are `AtomicU8` accessed with `Relaxed`; the counters carry the
//! ordering.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Default ring capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 4;

/// Result of a single [`Producer::try_fill`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Nothing was read: the buffer still holds unread bytes, the producer
    /// was halted, or the read was interrupted.
    Skipped,
    /// The given number of bytes were published.
    Filled(usize),
    /// The source reported end-of-stream.
    EndOfStream,
}

impl FillOutcome {
    /// Whether this attempt published bytes.
    #[inline]
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled(_))
    }
}

/// Fixed-capacity SPSC byte ring.
#[derive(Debug)]
pub struct StreamRingBuffer {
    slots: Box<[AtomicU8]>,
    write_seq: AtomicU64,
    read_seq: AtomicU64,
    halted: AtomicBool,
    closed: AtomicBool,
}

impl StreamRingBuffer {
    /// Create an empty ring with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be at least 1");
        Self {
            slots: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
            write_seq: AtomicU64::new(0),
            read_seq: AtomicU64::new(0),
            halted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes published but not yet taken.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read_seq.load(Ordering::Acquire);
        let write = self.write_seq.load(Ordering::Acquire);
        write.saturating_sub(read) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes published since creation.
    #[inline]
    pub fn total_written(&self) -> u64 {
        self.write_seq.load(Ordering::Acquire)
    }

    /// Total bytes taken since creation.
    #[inline]
    pub fn total_read(&self) -> u64 {
        self.read_seq.load(Ordering::Acquire)
    }

    /// Stop the producer. Fills started after this call are no-ops.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Whether the producer saw end-of-stream or a read error.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Get the producer side of the ring.
    ///
    /// Only one producer may be active at a time.
    pub fn producer(&self) -> Producer<'_> {
        Producer {
            ring: self,
            chunk: vec![0u8; self.capacity()],
        }
    }

    /// Take the next byte, if any. Consumer side only.
    pub fn try_take(&self) -> Option<u8> {
        // The consumer is the only writer of read_seq.
        let read = self.read_seq.load(Ordering::Relaxed);
        let write = self.write_seq.load(Ordering::Acquire);
        if read >= write {
            return None;
        }

        let byte = self.slots[self.slot(read)].load(Ordering::Relaxed);
        self.read_seq.store(read + 1, Ordering::Release);
        Some(byte)
    }

    /// Take every byte currently buffered, in order. Consumer side only.
    pub fn drain_residual(&self) -> Vec<u8> {
        let mut rest = Vec::with_capacity(self.len());
        while let Some(byte) = self.try_take() {
            rest.push(byte);
        }
        rest
    }

    #[inline]
    fn slot(&self, seq: u64) -> usize {
        (seq % self.slots.len() as u64) as usize
    }
}

/// Producer handle: owns the staging chunk a fill is read into.
pub struct Producer<'a> {
    ring: &'a StreamRingBuffer,
    chunk: Vec<u8>,
}

impl Producer<'_> {
    /// Refill the ring from `source` if it is empty and not halted.
    ///
    /// Issues a single `read` of up to `capacity` bytes and publishes exactly
    /// the bytes it delivered. A zero-length read marks the ring closed.
    pub fn try_fill<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<FillOutcome> {
        let ring = self.ring;
        if ring.is_halted() {
            return Ok(FillOutcome::Skipped);
        }

        // The producer is the only writer of write_seq.
        let write = ring.write_seq.load(Ordering::Relaxed);
        let read = ring.read_seq.load(Ordering::Acquire);
        if write > read {
            return Ok(FillOutcome::Skipped);
        }

        let n = match source.read(&mut self.chunk) {
            Ok(0) => {
                ring.close();
                return Ok(FillOutcome::EndOfStream);
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(FillOutcome::Skipped),
            Err(e) => {
                ring.close();
                return Err(e);
            }
        };

        for (i, byte) in self.chunk[..n].iter().enumerate() {
            ring.slots[ring.slot(write + i as u64)].store(*byte, Ordering::Relaxed);
        }
        ring.write_seq.store(write + n as u64, Ordering::Release);
        Ok(FillOutcome::Filled(n))
    }

    /// Keep filling until halted or the source ends. Returns bytes moved.
    ///
    /// Spins while the ring is full. A read already in flight when the ring
    /// is halted still publishes its bytes.
    pub fn run<R: Read + ?Sized>(mut self, source: &mut R) -> io::Result<u64> {
        let mut moved = 0u64;
        while !self.ring.is_halted() {
            match self.try_fill(source)? {
                FillOutcome::Filled(n) => {
                    moved += n as u64;
                    tracing::trace!(bytes = n, "ring filled");
                }
                FillOutcome::Skipped => std::hint::spin_loop(),
                FillOutcome::EndOfStream => {
                    tracing::debug!(moved, "source reached end of stream");
                    break;
                }
            }
        }
        Ok(moved)
    }
}
