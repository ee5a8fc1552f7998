//! # Response Module
//!
//! Turns a handler outcome into the HTTP-shaped byte stream the CGI host
//! relays to the client: a status line, a fixed header block, a blank line
//! and the body.
//!
//! Every response carries the same four headers, in this order:
//!
//! ```text
//! Content-Type: <type>
//! Content-Length: <body bytes>
//! Cache-Control: no-cache, no-store, must-revalidate
//! Connection: close
//! ```
//!
//! followed by any endpoint-specific headers (`X-Upload-Bytes`, ...).
//!
//! This module never terminates the process. [`Response::exit_code`] reports
//! the status the driver should exit with; the driver alone calls exit.

use http::StatusCode;
use serde::Deserialize;
use std::io::{self, Write};

/// Cache directive sent with every response.
pub const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Outcome classification understood by the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalError,
}

impl Status {
    /// Numeric HTTP status for this classification.
    pub fn code(self) -> StatusCode {
        match self {
            Status::Ok => StatusCode::OK,
            Status::BadRequest => StatusCode::BAD_REQUEST,
            Status::Forbidden => StatusCode::FORBIDDEN,
            Status::NotFound => StatusCode::NOT_FOUND,
            Status::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Status::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_success(self) -> bool {
        self.code().is_success()
    }
}

fn status_reason(code: StatusCode) -> &'static str {
    code.canonical_reason().unwrap_or("Unknown")
}

/// Shape of the first line of output.
///
/// `Http` writes `HTTP/1.1 200 OK`, which hosts that relay the script output
/// verbatim expect. `Cgi` writes the CGI/1.1 `Status: 200 OK` header instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLineStyle {
    #[default]
    Http,
    Cgi,
}

impl StatusLineStyle {
    /// Parse a style name; unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(StatusLineStyle::Http),
            "cgi" => Some(StatusLineStyle::Cgi),
            _ => None,
        }
    }
}

/// A fully formed response waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    content_type: &'static str,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Response {
    pub fn new(status: Status, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `text/html` response wrapping `inner` in a minimal page.
    ///
    /// `inner` is inserted as-is; escape untrusted text with [`escape_html`].
    pub fn html(status: Status, inner: &str) -> Self {
        Self::new(
            status,
            "text/html",
            format!("<html><body>{inner}</body></html>"),
        )
    }

    pub fn text(status: Status, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain", body)
    }

    /// Append an extra header after the fixed set.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Look up an extra header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Process exit status matching this response: 0 for 2xx, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.status.is_success() {
            0
        } else {
            1
        }
    }

    /// Write status line, headers, blank line and body, then flush.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W, style: StatusLineStyle) -> io::Result<()> {
        let code = self.status.code();
        match style {
            StatusLineStyle::Http => write!(
                out,
                "HTTP/1.1 {} {}\r\n",
                code.as_u16(),
                status_reason(code)
            )?,
            StatusLineStyle::Cgi => {
                write!(out, "Status: {} {}\r\n", code.as_u16(), status_reason(code))?
            }
        }
        write!(out, "Content-Type: {}\r\n", self.content_type)?;
        write!(out, "Content-Length: {}\r\n", self.body.len())?;
        write!(out, "Cache-Control: {CACHE_CONTROL}\r\n")?;
        out.write_all(b"Connection: close\r\n")?;
        for (name, value) in &self.headers {
            write!(out, "{name}: {value}\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(self.body.as_bytes())?;
        out.flush()
    }

    /// Serialized form, mostly for tests and logging.
    pub fn to_bytes(&self, style: StatusLineStyle) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(160 + self.body.len());
        self.write_to(&mut buf, style)?;
        Ok(buf)
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
