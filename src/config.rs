//! # Configuration Module
//!
//! Handler configuration is built once at process start and passed by
//! reference to every stage. Nothing below the driver reads the environment.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config <FILE>` or `CGI_UPLOAD_CONFIG`)
//! 3. Environment variables
//! 4. Command-line flags (applied by the CLI)
//!
//! ## Environment Variables
//!
//! ### `UPLOAD_FOLDER`
//!
//! Directory uploads are written to and deleted from. Relative paths are
//! resolved against the working directory of the CGI process.
//!
//! Default: `uploads`
//!
//! ### `CGI_UPLOAD_MAX_HEADER_BYTES`
//!
//! Upper bound on bytes read while looking for the end of the multipart
//! headers. Accepts decimal (`65536`) or hexadecimal (`0x10000`).
//!
//! Default: `65536`
//!
//! ### `CGI_UPLOAD_STREAM_CHUNK`
//!
//! Largest single read while streaming the body to disk.
//!
//! Default: `4096`
//!
//! ### `CGI_UPLOAD_STATUS_LINE`
//!
//! `http` writes `HTTP/1.1 <code> <reason>`; `cgi` writes
//! `Status: <code> <reason>`.
//!
//! Default: `http`
//!
//! ## Example File
//!
//! ```toml
//! upload_dir = "/srv/www/uploads"
//! max_header_bytes = 131072
//! stream_chunk_size = 8192
//! status_line = "cgi"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::response::StatusLineStyle;

pub const ENV_UPLOAD_FOLDER: &str = "UPLOAD_FOLDER";
pub const ENV_MAX_HEADER_BYTES: &str = "CGI_UPLOAD_MAX_HEADER_BYTES";
pub const ENV_STREAM_CHUNK: &str = "CGI_UPLOAD_STREAM_CHUNK";
pub const ENV_STATUS_LINE: &str = "CGI_UPLOAD_STATUS_LINE";

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_HEADER_READ_SIZE: usize = 1024;
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 4096;

/// Settings shared by the upload and delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    /// Directory uploads land in (default: `uploads`)
    pub upload_dir: PathBuf,
    /// Size of each read while scanning for the header delimiter (default: 1024)
    pub header_read_size: usize,
    /// Bytes the header scan may pull before giving up (default: 64 KiB)
    pub max_header_bytes: usize,
    /// Largest read while streaming the body (default: 4096)
    pub stream_chunk_size: usize,
    /// Status line flavour (default: `http`)
    pub status_line: StatusLineStyle,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            header_read_size: DEFAULT_HEADER_READ_SIZE,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            status_line: StatusLineStyle::Http,
        }
    }
}

impl HandlerConfig {
    /// Defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with(file, |key| env::var(key).ok())
    }

    /// [`HandlerConfig::load`] with the environment supplied by `lookup`.
    pub fn load_with<F>(file: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        Ok(config.normalized())
    }

    /// Defaults overridden by the environment only.
    ///
    /// Used when the config file cannot be loaded, so error responses still
    /// honour `CGI_UPLOAD_STATUS_LINE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config.normalized()
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: HandlerConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_UPLOAD_FOLDER).filter(|v| !v.trim().is_empty()) {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MAX_HEADER_BYTES) {
            match parse_size(&raw) {
                Some(n) => self.max_header_bytes = n,
                None => warn!(variable = ENV_MAX_HEADER_BYTES, value = %raw, "ignoring unparseable size"),
            }
        }
        if let Some(raw) = lookup(ENV_STREAM_CHUNK) {
            match parse_size(&raw) {
                Some(n) => self.stream_chunk_size = n,
                None => warn!(variable = ENV_STREAM_CHUNK, value = %raw, "ignoring unparseable size"),
            }
        }
        if let Some(raw) = lookup(ENV_STATUS_LINE) {
            match StatusLineStyle::parse(&raw) {
                Some(style) => self.status_line = style,
                None => warn!(variable = ENV_STATUS_LINE, value = %raw, "ignoring unknown status line style"),
            }
        }
    }

    /// Clamp sizes so every read requests at least one byte.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.header_read_size = self.header_read_size.max(1);
        self.max_header_bytes = self.max_header_bytes.max(1);
        self.stream_chunk_size = self.stream_chunk_size.max(1);
        self
    }
}

/// Decimal or `0x`-prefixed hexadecimal byte count.
fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
