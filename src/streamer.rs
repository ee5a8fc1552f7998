//! Byte-accounted streaming of the request body to disk.
//!
//! Holds at most one chunk in memory at a time, on top of the body prefix the
//! header scan already pulled. Reads are sized so the total consumed never
//! passes the declared content length.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::HandlerError;

/// Result of a completed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    /// Bytes written to the destination file, body prefix included
    pub bytes_written: u64,
    /// Bytes the declared length still called for when the input ended
    pub missing: u64,
}

impl StreamReport {
    /// True when the input closed before the declared length was reached.
    pub fn is_truncated(&self) -> bool {
        self.missing > 0
    }
}

/// Read into `buf`, retrying on `Interrupted`. Returns 0 only at end of input.
pub(crate) fn read_some<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Streams the remainder of a body into a file with a fixed-size buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteStreamer {
    chunk_size: usize,
}

impl ByteStreamer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create or truncate `path`, write `prefix`, then copy up to `remaining`
    /// more bytes from `reader`.
    ///
    /// End of input before `remaining` reaches zero stops the copy without an
    /// error; the shortfall is reported in [`StreamReport::missing`]. Any
    /// failure opening or writing the file is a [`HandlerError::Storage`] and
    /// leaves whatever was already written in place.
    pub fn stream_to_file<R: Read + ?Sized>(
        &self,
        path: &Path,
        prefix: &[u8],
        remaining: u64,
        reader: &mut R,
    ) -> Result<StreamReport, HandlerError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                HandlerError::storage(format!("Error opening file {}", path.display()), e)
            })?;
        self.stream_into(&mut file, path, prefix, remaining, reader)
    }

    fn stream_into<R: Read + ?Sized>(
        &self,
        file: &mut File,
        path: &Path,
        prefix: &[u8],
        mut remaining: u64,
        reader: &mut R,
    ) -> Result<StreamReport, HandlerError> {
        let write_err =
            |e: io::Error| HandlerError::storage(format!("Error writing file {}", path.display()), e);

        file.write_all(prefix).map_err(write_err)?;
        let mut bytes_written = prefix.len() as u64;

        let mut chunk = vec![0u8; self.chunk_size];
        while remaining > 0 {
            let want = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.chunk_size);
            let n = read_some(reader, &mut chunk[..want])
                .map_err(|source| HandlerError::StreamRead { source })?;
            if n == 0 {
                break;
            }
            file.write_all(&chunk[..n]).map_err(write_err)?;
            bytes_written += n as u64;
            remaining -= n as u64;
        }
        file.flush().map_err(write_err)?;

        if remaining > 0 {
            warn!(
                path = %path.display(),
                bytes_written,
                missing = remaining,
                "request body ended before the declared content length"
            );
        } else {
            debug!(path = %path.display(), bytes_written, "body streamed");
        }

        Ok(StreamReport {
            bytes_written,
            missing: remaining,
        })
    }
}
