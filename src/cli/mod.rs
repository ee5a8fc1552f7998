//! # CLI Module
//!
//! Command-line and CGI entry points, and the top-level driver that turns one
//! request into one response and one exit status.
//!
//! ## Commands
//!
//! ### `upload`
//!
//! Read a multipart body from stdin and store its file part:
//!
//! ```bash
//! REQUEST_METHOD=POST CONTENT_LENGTH=37 UPLOAD_FOLDER=/srv/uploads \
//!     cgi-upload upload < body.bin
//! ```
//!
//! ### `delete`
//!
//! Remove `filename` from the upload directory:
//!
//! ```bash
//! cgi-upload delete --method DELETE --query-string 'filename=a.txt'
//! ```
//!
//! Every flag falls back to its CGI variable (`REQUEST_METHOD`,
//! `CONTENT_LENGTH`, `QUERY_STRING`, `HTTP_X_REQUEST_ID`).
//!
//! ## CGI Binaries
//!
//! `upload-handler` and `delete-handler` take no arguments and read only the
//! environment, so a host can point a location straight at them.
//!
//! ## Exit Status
//!
//! 0 after a 2xx response, 1 otherwise. A response is always written, even
//! when configuration loading fails or a handler panics.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{
    internal_error_response, respond, run_cgi, run_cli, run_endpoint, CgiArgs, Cli, Commands,
    Endpoint, RequestArgs,
};
