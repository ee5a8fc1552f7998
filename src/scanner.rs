//! Header scanning over a partial byte stream.
//!
//! The multipart header block and the first bytes of file content usually
//! arrive in the same read. [`HeaderScanner::scan`] keeps everything it pulled
//! so the content bytes can be written before streaming resumes, and reports
//! how many bytes were consumed so the caller's byte accounting starts from
//! the right place.

use std::io::Read;

use tracing::trace;

use crate::error::HandlerError;
use crate::streamer::read_some;

/// Blank line ending a header block.
pub const HEADER_DELIMITER: &[u8; 4] = b"\r\n\r\n";

/// Bytes pulled while looking for [`HEADER_DELIMITER`], split at the delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    buffer: Vec<u8>,
    body_offset: usize,
}

impl HeaderScan {
    /// Header block, delimiter excluded.
    pub fn header_bytes(&self) -> &[u8] {
        &self.buffer[..self.body_offset - HEADER_DELIMITER.len()]
    }

    /// Content bytes that arrived together with the headers.
    pub fn body_prefix(&self) -> &[u8] {
        &self.buffer[self.body_offset..]
    }

    /// Offset of the first content byte in the consumed input.
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Total bytes pulled from the stream.
    pub fn bytes_consumed(&self) -> usize {
        self.buffer.len()
    }
}

/// Accumulates reads until the header delimiter shows up.
#[derive(Debug, Clone, Copy)]
pub struct HeaderScanner {
    read_size: usize,
    limit: usize,
}

impl HeaderScanner {
    /// `read_size` bytes per read, at most `limit` bytes in total.
    pub fn new(read_size: usize, limit: usize) -> Self {
        Self {
            read_size: read_size.max(1),
            limit,
        }
    }

    /// Read until the delimiter is found, the limit is hit, or input ends.
    ///
    /// The search runs over the accumulated buffer, so a delimiter split
    /// across reads is still found. Only the last three bytes of earlier data
    /// are searched again after each read.
    pub fn scan<R: Read + ?Sized>(&self, reader: &mut R) -> Result<HeaderScan, HandlerError> {
        let mut buffer: Vec<u8> = Vec::with_capacity(self.read_size.min(self.limit));
        let mut search_from = 0;

        loop {
            if let Some(pos) = find_delimiter(&buffer, search_from) {
                trace!(header_len = pos, consumed = buffer.len(), "header delimiter found");
                return Ok(HeaderScan {
                    buffer,
                    body_offset: pos + HEADER_DELIMITER.len(),
                });
            }
            search_from = buffer.len().saturating_sub(HEADER_DELIMITER.len() - 1);

            if buffer.len() >= self.limit {
                return Err(HandlerError::HeaderNotFound {
                    scanned: buffer.len(),
                });
            }

            let start = buffer.len();
            let want = self.read_size.min(self.limit - start);
            buffer.resize(start + want, 0);
            let n = match read_some(reader, &mut buffer[start..]) {
                Ok(n) => n,
                Err(source) => return Err(HandlerError::StreamRead { source }),
            };
            buffer.truncate(start + n);

            if n == 0 {
                return Err(HandlerError::HeaderNotFound {
                    scanned: buffer.len(),
                });
            }
        }
    }
}

fn find_delimiter(haystack: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(HEADER_DELIMITER.len())
        .position(|w| w == HEADER_DELIMITER)
        .map(|p| p + from)
}
