//! Output encoding for transformed files.
//!
//! [`CompressingSink`] wraps the destination writer and exposes one [`Write`] interface
//! regardless of the configured [`OutputEncoding`]:
//!
//! - **Identity**: writes go straight to the destination.
//! - **Gzip** (feature `compression-gzip`): writes go into a bounded [`pipe`]; a dedicated
//!   encoder thread drains the pipe through a `flate2` gzip encoder into the destination.
//!   A full pipe blocks the producer, so row production is throttled to the speed of
//!   compression and nothing like the whole file is ever buffered in memory.
//!
//! ## Error propagation
//!
//! When the encoder fails (a destination write error, or the gzip trailer cannot be
//! written), it drops its end of the pipe. The producer's next write then fails, and the
//! sink joins the encoder to report the encoder's own error instead of a bare broken pipe.
//! [`CompressingSink::finish`] always joins the encoder and surfaces its final error,
//! including a failure while finishing the gzip stream.
//!
//! ## Example
//! ```
//! use csv_transformer::io::compression::{CompressingSink, OutputEncoding};
//! use std::io::Write;
//! # fn main() -> std::io::Result<()> {
//! let mut sink = CompressingSink::new(Vec::new(), OutputEncoding::Identity)?;
//! sink.write_all(b"a,b\n")?;
//! let bytes = sink.finish()?;
//! assert_eq!(bytes, b"a,b\n");
//! # Ok(())
//! # }
//! ```

use crate::error::panic_message;
use crate::io::pipe::{DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE, PipeReader, PipeWriter, pipe};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::thread::{self, JoinHandle};

/// `Content-Encoding` value attached to gzip output.
pub const CONTENT_ENCODING_GZIP: &str = "gzip";

/// How transformed output is encoded before it is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    #[default]
    Identity,
    Gzip,
}

impl OutputEncoding {
    /// The content-encoding marker the stored object must carry, if any.
    #[must_use]
    pub const fn content_encoding(self) -> Option<&'static str> {
        match self {
            Self::Identity => None,
            Self::Gzip => Some(CONTENT_ENCODING_GZIP),
        }
    }
}

/// Destination writer with optional on-the-fly compression.
pub struct CompressingSink<W: Write + Send + 'static> {
    inner: SinkInner<W>,
}

enum SinkInner<W: Write + Send + 'static> {
    Identity(W),
    Encoded {
        pipe: PipeWriter,
        encoder: Option<JoinHandle<io::Result<W>>>,
    },
}

impl<W: Write + Send + 'static> CompressingSink<W> {
    /// Wrap `dest`, spawning the encoder thread when `encoding` compresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder thread cannot be spawned, or if `encoding` needs a
    /// codec that was not compiled in.
    pub fn new(dest: W, encoding: OutputEncoding) -> io::Result<Self> {
        Self::with_pipe(dest, encoding, DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE)
    }

    /// Like [`new`](Self::new) with an explicit pipe size.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_pipe(
        dest: W,
        encoding: OutputEncoding,
        capacity: usize,
        chunk_size: usize,
    ) -> io::Result<Self> {
        let inner = match encoding {
            OutputEncoding::Identity => SinkInner::Identity(dest),
            OutputEncoding::Gzip => {
                let (writer, reader) = pipe(capacity, chunk_size);
                let encoder = thread::Builder::new()
                    .name("gzip-encoder".to_string())
                    .spawn(move || gzip_encode(reader, dest))?;
                SinkInner::Encoded {
                    pipe: writer,
                    encoder: Some(encoder),
                }
            }
        };
        Ok(Self { inner })
    }

    /// Close the stream, wait for the encoder and hand back the destination.
    ///
    /// # Errors
    ///
    /// Returns the first failure among flushing the destination, delivering the remaining
    /// bytes to the encoder, and the encoder itself (the encoder's error wins, since it
    /// explains a failed delivery).
    pub fn finish(self) -> io::Result<W> {
        match self.inner {
            SinkInner::Identity(mut dest) => {
                dest.flush()?;
                Ok(dest)
            }
            SinkInner::Encoded { pipe, encoder } => {
                let closed = pipe.close();
                let encoded = match encoder {
                    Some(handle) => join_encoder(handle)?,
                    None => return Err(encoder_gone()),
                };
                closed?;
                Ok(encoded)
            }
        }
    }

    /// Abort the stream and wait for the encoder to stop. The destination is discarded.
    pub fn abort(self, reason: &str) {
        if let SinkInner::Encoded { pipe, encoder } = self.inner {
            pipe.close_with_error(io::Error::other(reason.to_string()));
            if let Some(handle) = encoder {
                let _ = handle.join();
            }
        }
    }

    fn encoder_failure(
        encoder: &mut Option<JoinHandle<io::Result<W>>>,
        err: io::Error,
    ) -> io::Error {
        if err.kind() != io::ErrorKind::BrokenPipe {
            return err;
        }
        match encoder.take() {
            Some(handle) => match join_encoder(handle) {
                Err(encoder_err) => encoder_err,
                Ok(_) => err,
            },
            None => encoder_gone(),
        }
    }
}

impl<W: Write + Send + 'static> Write for CompressingSink<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            SinkInner::Identity(dest) => dest.write(data),
            SinkInner::Encoded { pipe, encoder } => pipe
                .write(data)
                .map_err(|e| Self::encoder_failure(encoder, e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            SinkInner::Identity(dest) => dest.flush(),
            SinkInner::Encoded { pipe, encoder } => {
                pipe.flush().map_err(|e| Self::encoder_failure(encoder, e))
            }
        }
    }
}

fn encoder_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "gzip encoder already stopped")
}

fn join_encoder<W>(handle: JoinHandle<io::Result<W>>) -> io::Result<W> {
    handle.join().map_err(|payload| {
        io::Error::other(format!(
            "gzip encoder panicked: {}",
            panic_message(payload.as_ref())
        ))
    })?
}

#[cfg(feature = "compression-gzip")]
fn gzip_encode<W: Write>(mut reader: PipeReader, dest: W) -> io::Result<W> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut encoder = GzEncoder::new(dest, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    let mut dest = encoder.finish()?;
    dest.flush()?;
    Ok(dest)
}

#[cfg(not(feature = "compression-gzip"))]
fn gzip_encode<W: Write>(_reader: PipeReader, _dest: W) -> io::Result<W> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "gzip output requires the compression-gzip feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `limit` bytes, then fails every write.
    struct FlakyDest {
        written: usize,
        limit: usize,
    }

    impl Write for FlakyDest {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.written + data.len() > self.limit {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
            }
            self.written += data.len();
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn identity_passes_bytes_through() -> io::Result<()> {
        let mut sink = CompressingSink::new(Vec::new(), OutputEncoding::Identity)?;
        sink.write_all(b"Observation,Data_Marking\n")?;
        assert_eq!(sink.finish()?, b"Observation,Data_Marking\n");
        Ok(())
    }

    #[test]
    fn content_encoding_marker() {
        assert_eq!(OutputEncoding::Identity.content_encoding(), None);
        assert_eq!(OutputEncoding::Gzip.content_encoding(), Some("gzip"));
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_output_decodes_to_the_input() -> io::Result<()> {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let input: Vec<u8> = (0..20_000)
            .flat_map(|i| format!("{i},ok,count,E92000001,Geography,E92000001\n").into_bytes())
            .collect();

        let mut sink = CompressingSink::with_pipe(Vec::new(), OutputEncoding::Gzip, 2, 1024)?;
        for line in input.chunks(37) {
            sink.write_all(line)?;
        }
        let encoded = sink.finish()?;
        assert!(encoded.len() < input.len());
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);

        let mut decoded = Vec::new();
        GzDecoder::new(encoded.as_slice()).read_to_end(&mut decoded)?;
        assert_eq!(decoded, input);
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn broken_destination_surfaces_the_encoder_error() -> io::Result<()> {
        let dest = FlakyDest {
            written: 0,
            limit: 16,
        };
        let mut sink = CompressingSink::with_pipe(dest, OutputEncoding::Gzip, 1, 256)?;

        // Incompressible-ish input so the encoder has to hit the destination early.
        let mut state = 0x2545_f491_u32;
        let mut failure = None;
        for _ in 0..10_000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if let Err(e) = sink.write_all(&state.to_le_bytes()) {
                failure = Some(e);
                break;
            }
        }

        let err = match failure {
            Some(e) => e,
            None => sink.finish().err().expect("finish must fail"),
        };
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn failure_while_finishing_is_not_dropped() -> io::Result<()> {
        // Everything fits until the gzip trailer is flushed.
        let dest = FlakyDest {
            written: 0,
            limit: 10,
        };
        let mut sink = CompressingSink::new(dest, OutputEncoding::Gzip)?;
        sink.write_all(b"tiny")?;
        let err = sink.finish().err().expect("trailer write must fail");
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        Ok(())
    }
}
