//! # Upload Endpoint
//!
//! Accepts a raw multipart request body on a byte stream and writes the single
//! file part it carries into the upload directory.
//!
//! ```text
//! method check ─► scan headers ─► extract filename ─► sanitise
//!                                                        │
//!            response ◄─ stream body ◄─ create upload dir ◄┘
//! ```
//!
//! Each stage returns `Result<_, HandlerError>`; [`UploadHandler::handle`]
//! converts the final result into a [`Response`] exactly once. Nothing here
//! writes to stdout or exits the process.
//!
//! ## Byte accounting
//!
//! Everything the header scan pulls counts against the declared content
//! length. Streaming resumes with `declared - consumed` bytes left, so a body
//! is never read past its declared end. Input that ends early is accepted;
//! the shortfall is logged and reported in an `X-Upload-Truncated` header.
//! Without a declared length only the bytes pulled by the header scan are
//! stored; that is flagged as `X-Upload-Truncated: unknown`.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::filename::{sanitize_filename, FilenameExtractor, PatternExtractor};
use crate::response::{escape_html, Response, Status};
use crate::scanner::HeaderScanner;
use crate::streamer::ByteStreamer;

/// The only method the upload endpoint accepts.
pub const UPLOAD_METHOD: &str = "POST";

/// A file that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Sanitised name the file was stored under
    pub filename: String,
    /// Full path of the stored file
    pub path: PathBuf,
    /// Bytes written to the file
    pub bytes_written: u64,
    /// Bytes pulled from the input, headers included
    pub bytes_consumed: u64,
    /// Bytes the declared content length still called for at end of input
    pub missing: u64,
    /// No length was declared, so anything past the first scanned bytes was
    /// left unread
    pub length_unknown: bool,
}

/// Upload pipeline parameterised by its filename extraction strategy.
#[derive(Debug, Clone)]
pub struct UploadHandler<E = PatternExtractor> {
    config: HandlerConfig,
    extractor: E,
}

impl UploadHandler<PatternExtractor> {
    pub fn new(config: HandlerConfig) -> Self {
        Self::with_extractor(config, PatternExtractor)
    }
}

impl<E: FilenameExtractor> UploadHandler<E> {
    pub fn with_extractor(config: HandlerConfig, extractor: E) -> Self {
        Self {
            config: config.normalized(),
            extractor,
        }
    }

    /// Run the pipeline and turn the result into a response.
    pub fn handle<R: Read + ?Sized>(&self, ctx: &RequestContext, reader: &mut R) -> Response {
        match self.process(ctx, reader) {
            Ok(outcome) => success_response(ctx, &outcome),
            Err(err) => {
                match err.status() {
                    Status::InternalError => warn!(error = %err, "upload failed"),
                    _ => info!(error = %err, status = %err.status().code(), "upload rejected"),
                }
                error_response(&err)
            }
        }
    }

    /// Run the pipeline, returning the tagged outcome.
    pub fn process<R: Read + ?Sized>(
        &self,
        ctx: &RequestContext,
        reader: &mut R,
    ) -> Result<UploadOutcome, HandlerError> {
        if ctx.method() != UPLOAD_METHOD {
            return Err(HandlerError::MethodNotAllowed {
                method: ctx.method().to_string(),
                allowed: UPLOAD_METHOD,
            });
        }

        let declared = ctx.declared_content_length();
        let scan = self.scanner_for(declared).scan(reader)?;
        debug!(
            header_len = scan.header_bytes().len(),
            prefix_len = scan.body_prefix().len(),
            "headers scanned"
        );

        let raw = self
            .extractor
            .extract(scan.header_bytes())
            .ok_or(HandlerError::FilenameNotFound)?;
        let filename = sanitize_filename(&raw)?;
        if filename != raw {
            warn!(raw = %raw, sanitized = %filename, "stripped path components from filename");
        }

        let upload_dir = ctx.upload_dir();
        fs::create_dir_all(upload_dir).map_err(|e| {
            HandlerError::storage(
                format!("Error creating upload directory {}", upload_dir.display()),
                e,
            )
        })?;
        let path = upload_dir.join(&filename);

        let consumed = scan.bytes_consumed() as u64;
        let remaining = declared.saturating_sub(consumed);
        let report = ByteStreamer::new(self.config.stream_chunk_size).stream_to_file(
            &path,
            scan.body_prefix(),
            remaining,
            reader,
        )?;

        let bytes_consumed = consumed + (remaining - report.missing);
        let length_unknown = declared == 0 && consumed > 0;
        if length_unknown {
            warn!(
                consumed,
                bytes_written = report.bytes_written,
                "no content length declared; stored only the scanned prefix"
            );
        }
        info!(
            filename = %filename,
            bytes_written = report.bytes_written,
            bytes_consumed,
            declared,
            "upload stored"
        );

        Ok(UploadOutcome {
            filename,
            path,
            bytes_written: report.bytes_written,
            bytes_consumed,
            missing: report.missing,
            length_unknown,
        })
    }

    /// The scan may not read past the declared body; an unknown (zero)
    /// length leaves only the configured bound.
    fn scanner_for(&self, declared: u64) -> HeaderScanner {
        let mut limit = self.config.max_header_bytes;
        if declared > 0 {
            limit = limit.min(usize::try_from(declared).unwrap_or(usize::MAX));
        }
        HeaderScanner::new(self.config.header_read_size, limit)
    }
}

fn success_response(ctx: &RequestContext, outcome: &UploadOutcome) -> Response {
    let mut res = Response::html(
        Status::Ok,
        &format!(
            "File '{}' uploaded successfully to {}.",
            escape_html(&outcome.filename),
            escape_html(&ctx.upload_dir().display().to_string())
        ),
    )
    .with_header("X-Upload-Bytes", outcome.bytes_written.to_string());
    if outcome.length_unknown {
        res = res.with_header("X-Upload-Truncated", "unknown");
    } else if outcome.missing > 0 {
        res = res.with_header("X-Upload-Truncated", outcome.missing.to_string());
    }
    res
}

fn error_response(err: &HandlerError) -> Response {
    Response::html(
        err.status(),
        &format!("Error: {}", escape_html(&err.to_string())),
    )
}
