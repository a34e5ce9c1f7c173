//! Bounded single-producer/single-consumer byte pipe.
//!
//! [`pipe`] returns a connected ([`PipeWriter`], [`PipeReader`]) pair. Bytes written to the
//! writer are grouped into chunks of `chunk_size` and handed over through a channel that
//! holds at most `capacity` chunks, so a fast producer blocks as soon as the consumer falls
//! behind. The total amount of buffered data is bounded by
//! `(capacity + 2) * chunk_size` bytes.
//!
//! Close signals travel in both directions:
//! - [`PipeWriter::close`] delivers end-of-stream; the reader returns `Ok(0)` after the
//!   last chunk.
//! - [`PipeWriter::close_with_error`] (and dropping an unclosed writer) delivers an error
//!   instead, so the consumer never mistakes a truncated stream for a complete one.
//! - Dropping the [`PipeReader`] makes every further write fail with
//!   [`io::ErrorKind::BrokenPipe`], unblocking a producer that is waiting for space.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::io::{self, Read, Write};

/// Default number of chunks in flight.
pub const DEFAULT_CAPACITY: usize = 8;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

type Chunk = io::Result<Vec<u8>>;

/// Create a pipe holding at most `capacity` chunks of `chunk_size` bytes.
///
/// Both arguments are clamped to at least 1.
#[must_use]
pub fn pipe(capacity: usize, chunk_size: usize) -> (PipeWriter, PipeReader) {
    let chunk_size = chunk_size.max(1);
    let (tx, rx) = bounded(capacity.max(1));
    (
        PipeWriter {
            tx: Some(tx),
            buf: Vec::with_capacity(chunk_size),
            chunk_size,
        },
        PipeReader {
            rx,
            current: Vec::new(),
            pos: 0,
        },
    )
}

/// Write end of a [`pipe`].
pub struct PipeWriter {
    tx: Option<Sender<Chunk>>,
    buf: Vec<u8>,
    chunk_size: usize,
}

impl PipeWriter {
    /// Flush pending bytes and signal end-of-stream to the reader.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::BrokenPipe`] if the reader is gone before the remaining
    /// bytes could be delivered.
    pub fn close(mut self) -> io::Result<()> {
        let flushed = self.send_buffered();
        self.tx = None;
        flushed
    }

    /// Abort the stream: the reader receives `err` instead of end-of-stream.
    pub fn close_with_error(mut self, err: io::Error) {
        self.buf.clear();
        if let Some(tx) = self.tx.take() {
            // A reader that is already gone does not need to hear about it.
            let _ = tx.send(Err(err));
        }
    }

    fn sender(&self) -> io::Result<&Sender<Chunk>> {
        self.tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe writer is closed"))
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(self.chunk_size));
        self.sender()?
            .send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader is closed"))
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.sender()?;
        if data.is_empty() {
            return Ok(0);
        }
        let room = self.chunk_size - self.buf.len();
        let taken = room.min(data.len());
        self.buf.extend_from_slice(&data[..taken]);
        if self.buf.len() == self.chunk_size {
            self.send_buffered()?;
        }
        Ok(taken)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "pipe writer dropped without closing",
            )));
        }
    }
}

/// Read end of a [`pipe`].
pub struct PipeReader {
    rx: Receiver<Chunk>,
    current: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => return Err(err),
                // Every sender is gone after a clean close.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.current.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
