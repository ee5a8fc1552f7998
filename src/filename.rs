//! Filename extraction from multipart part headers.
//!
//! Extraction and sanitisation are separate steps. An extractor returns the
//! raw `filename="..."` value exactly as the client sent it; only
//! [`sanitize_filename`] decides what may touch the filesystem.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::HandlerError;

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"filename="([^"]+)""#).expect("filename regex should be valid")
});

/// Strategy for pulling the raw filename out of a header block.
///
/// Implementations decode the bytes leniently and return the first
/// `filename="..."` value, or `None` if there is none.
pub trait FilenameExtractor {
    fn extract(&self, header: &[u8]) -> Option<String>;
}

/// Regex-based extraction. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl FilenameExtractor for PatternExtractor {
    fn extract(&self, header: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(header);
        FILENAME_PATTERN
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Hand-rolled token scan with the same matching rules as [`PatternExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenExtractor;

impl FilenameExtractor for TokenExtractor {
    fn extract(&self, header: &[u8]) -> Option<String> {
        const KEY: &str = "filename=\"";
        let text = String::from_utf8_lossy(header);
        let mut rest: &str = &text;
        while let Some(idx) = rest.find(KEY) {
            let value = &rest[idx + KEY.len()..];
            match value.find('"') {
                // Empty value: the regex would not match here either, keep looking.
                Some(0) => rest = value,
                Some(end) => return Some(value[..end].to_string()),
                None => return None,
            }
        }
        None
    }
}

/// Reduce a client-supplied filename to its final path segment.
///
/// Both `/` and `\` count as separators, whatever the host platform. Names
/// that are empty, `.` or `..` after stripping, or that contain NUL, are
/// rejected.
pub fn sanitize_filename(raw: &str) -> Result<String, HandlerError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(HandlerError::InvalidFilename {
            raw: raw.to_string(),
        });
    }
    Ok(base.to_string())
}
