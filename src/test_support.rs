//! In-memory streams for unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc;

/// Reader that hands out pre-split chunks, one (possibly partial) chunk per
/// `read` call, then reports end-of-stream.
#[derive(Debug, Default)]
pub struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
    reads: usize,
}

impl ChunkedReader {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            reads: 0,
        }
    }

    /// Split `data` into chunks of `size` bytes.
    pub fn split(data: &[u8], size: usize) -> Self {
        Self::new(data.chunks(size).map(<[u8]>::to_vec).collect())
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push_back(chunk);
        }
    }

    /// Number of `read` calls that returned data.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn remaining(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(chunk) = self.chunks.front_mut() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.chunks.pop_front();
        }
        self.reads += 1;
        Ok(n)
    }
}

/// Scripted peer: serves the server's bytes and records what the client
/// writes. The final reply only becomes readable once a full line starting
/// with `SUM` has been written, as with a real server.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    pub input: ChunkedReader,
    pub written: Vec<u8>,
    reply: Option<Vec<u8>>,
}

impl ScriptedStream {
    pub fn new(server_chunks: Vec<Vec<u8>>, reply: &[u8]) -> Self {
        Self {
            input: ChunkedReader::new(server_chunks),
            written: Vec::new(),
            reply: Some(reply.to_vec()),
        }
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        let answered = self
            .written
            .split(|b| *b == b'\n')
            .any(|line| line.starts_with(b"SUM"))
            && self.written.ends_with(b"\n");
        if answered {
            if let Some(reply) = self.reply.take() {
                self.input.push(reply);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Peer that serves its chunks and then goes silent: the next read blocks
/// until [`Release::release`] is called, then reports end-of-stream.
#[derive(Debug)]
pub struct StallingStream {
    input: ChunkedReader,
    wake: mpsc::Receiver<()>,
    pub written: Vec<u8>,
}

/// Wakes a stalled [`StallingStream`].
#[derive(Debug, Clone)]
pub struct Release(mpsc::Sender<()>);

impl Release {
    pub fn release(&self) {
        let _ = self.0.send(());
    }
}

impl StallingStream {
    pub fn new(chunks: Vec<Vec<u8>>) -> (Self, Release) {
        let (tx, rx) = mpsc::channel();
        let stream = Self {
            input: ChunkedReader::new(chunks),
            wake: rx,
            written: Vec::new(),
        };
        (stream, Release(tx))
    }
}

impl Read for StallingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.input.remaining() > 0 {
            return self.input.read(buf);
        }
        // A dropped `Release` also ends the stall.
        let _ = self.wake.recv();
        Ok(0)
    }
}

impl Write for StallingStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
