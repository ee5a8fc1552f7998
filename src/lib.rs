//! # cgi-upload
//!
//! **cgi-upload** implements the upload and delete endpoints of a CGI-hosted
//! web server. The host spawns one process per request, hands it the raw
//! request body on stdin and the request metadata in the environment, and
//! relays whatever the process writes to stdout back to the client.
//!
//! ## Overview
//!
//! The upload path is a single streaming pipeline. It never holds more than
//! the header block plus one chunk of the body in memory, whatever the size
//! of the upload:
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as CGI host
//!     participant Driver as cli::respond
//!     participant Scanner as scanner::HeaderScanner
//!     participant Parser as filename
//!     participant Streamer as streamer::ByteStreamer
//!     participant FS as File System
//!
//!     Host->>Driver: env (REQUEST_METHOD, CONTENT_LENGTH) + stdin
//!     Driver->>Driver: method == POST?
//!     alt Other method
//!         Driver-->>Host: 405 Method Not Allowed
//!     end
//!     Driver->>Scanner: scan(stdin)
//!     Scanner->>Scanner: read 1024-byte steps<br/>until \r\n\r\n
//!     alt Delimiter never seen
//!         Scanner-->>Host: 400 Bad Request
//!     end
//!     Scanner-->>Driver: header bytes + body prefix + bytes consumed
//!     Driver->>Parser: extract filename="..."
//!     alt No filename
//!         Parser-->>Host: 400 Bad Request
//!     end
//!     Parser-->>Driver: base name only
//!     Driver->>Streamer: prefix, declared - consumed
//!     Streamer->>FS: write prefix
//!     loop while remaining > 0
//!         Streamer->>Streamer: read min(4096, remaining)
//!         Streamer->>FS: write chunk
//!     end
//!     alt I/O error
//!         Streamer-->>Host: 500 Internal Server Error
//!     end
//!     Streamer-->>Driver: bytes written
//!     Driver-->>Host: 200 OK, exit 0
//! ```
//!
//! ## Modules
//!
//! - **[`scanner`]** - Header/body delimiter search over a partial stream
//! - **[`filename`]** - Filename extraction strategies and sanitisation
//! - **[`streamer`]** - Byte-accounted, chunked copy to disk
//! - **[`response`]** - Status classification and wire format
//! - **[`upload`]** / **[`delete`]** - The two endpoints
//! - **[`config`]** / **[`context`]** - Process and per-request settings
//! - **[`logging`]** - `tracing` subscriber setup (stderr or log file)
//! - **[`cli`]** - clap entry points and the top-level driver
//!
//! ## Quick Start
//!
//! ```no_run
//! use cgi_upload::{config::HandlerConfig, context::RequestContext, upload::UploadHandler};
//!
//! let config = HandlerConfig::load(None).expect("config");
//! let ctx = RequestContext::new("POST", 37, &config.upload_dir);
//! let response = UploadHandler::new(config).handle(&ctx, &mut std::io::stdin().lock());
//! println!("{}", response.status().code());
//! ```
//!
//! ## Known Gaps
//!
//! - Files are written in place. A failed or short upload leaves a partial
//!   file behind; there is no temp-file-and-rename step.
//! - Two requests storing the same filename race; the last writer wins.
//! - The multipart closing boundary is not stripped: everything after the
//!   header block up to the declared length lands in the file.

pub mod cli;
pub mod config;
pub mod context;
pub mod delete;
pub mod error;
pub mod filename;
pub mod ids;
pub mod logging;
pub mod response;
pub mod scanner;
pub mod streamer;
pub mod upload;

pub use error::HandlerError;
pub use response::{Response, Status};
