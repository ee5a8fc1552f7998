#![allow(dead_code)]

use cgi_upload::{config::HandlerConfig, context::RequestContext};
use std::io::{self, Read};
use std::path::Path;

/// Multipart-ish body: a header block naming `filename`, the delimiter, then
/// `payload`.
pub fn body_with_file(filename: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "------boundary\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(payload);
    body
}

/// Length of the header block in `body`, delimiter included.
pub fn header_len(body: &[u8]) -> usize {
    body.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
        .expect("body has a header delimiter")
}

pub fn post(dir: &Path, declared: u64) -> RequestContext {
    RequestContext::new("POST", declared, dir)
}

pub fn delete(dir: &Path, query: &str) -> RequestContext {
    RequestContext::new("DELETE", 0, dir).with_query_string(query)
}

pub fn config_for(dir: &Path) -> HandlerConfig {
    HandlerConfig {
        upload_dir: dir.to_path_buf(),
        ..HandlerConfig::default()
    }
}

/// Reader that returns at most `limits[i]` bytes on its i-th read, then
/// falls back to `tail` bytes per read.
pub struct Fragmented {
    data: Vec<u8>,
    pos: usize,
    limits: Vec<usize>,
    tail: usize,
    reads: usize,
}

impl Fragmented {
    pub fn new(data: Vec<u8>, limits: Vec<usize>, tail: usize) -> Self {
        Self {
            data,
            pos: 0,
            limits,
            tail: tail.max(1),
            reads: 0,
        }
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl Read for Fragmented {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let step = self.limits.get(self.reads).copied().unwrap_or(self.tail);
        self.reads += 1;
        let n = step
            .min(buf.len())
            .min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
