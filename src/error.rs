use std::fmt;
use std::io;

use crate::response::Status;

/// Every way an upload or delete request can fail.
///
/// Stages return this instead of writing responses themselves; the endpoint
/// converts it once via [`HandlerError::status`] and the driver emits it.
#[derive(Debug)]
pub enum HandlerError {
    /// Request method is not the one the endpoint accepts
    MethodNotAllowed {
        method: String,
        allowed: &'static str,
    },
    /// The `\r\n\r\n` delimiter did not appear within the scan bound
    HeaderNotFound {
        /// Bytes pulled from the stream before giving up
        scanned: usize,
    },
    /// The header block has no `filename="..."` attribute
    FilenameNotFound,
    /// The header-supplied filename has no usable final segment
    InvalidFilename { raw: String },
    /// Delete request without a `filename` query parameter
    MissingTarget,
    /// Delete target resolves outside the upload directory
    Forbidden { requested: String },
    /// Delete target does not exist
    NotFound { name: String },
    /// Directory creation, file open, write or unlink failed
    Storage { context: String, source: io::Error },
    /// Reading the request body failed
    StreamRead { source: io::Error },
}

impl HandlerError {
    pub(crate) fn storage(context: impl Into<String>, source: io::Error) -> Self {
        HandlerError::Storage {
            context: context.into(),
            source,
        }
    }

    /// Response classification for this failure.
    pub fn status(&self) -> Status {
        match self {
            HandlerError::MethodNotAllowed { .. } => Status::MethodNotAllowed,
            HandlerError::HeaderNotFound { .. }
            | HandlerError::FilenameNotFound
            | HandlerError::InvalidFilename { .. }
            | HandlerError::MissingTarget => Status::BadRequest,
            HandlerError::Forbidden { .. } => Status::Forbidden,
            HandlerError::NotFound { .. } => Status::NotFound,
            HandlerError::Storage { .. } | HandlerError::StreamRead { .. } => {
                Status::InternalError
            }
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::MethodNotAllowed { method, allowed } => {
                if method.is_empty() {
                    write!(f, "Only {allowed} method is supported.")
                } else {
                    write!(f, "Method {method} not allowed; only {allowed} is supported.")
                }
            }
            HandlerError::HeaderNotFound { scanned } => write!(
                f,
                "Unable to find the end of headers after reading {scanned} bytes."
            ),
            HandlerError::FilenameNotFound => {
                write!(f, "Unable to extract the filename from the headers.")
            }
            HandlerError::InvalidFilename { raw } => {
                write!(f, "Filename '{raw}' does not name a file.")
            }
            HandlerError::MissingTarget => write!(f, "File path not provided."),
            HandlerError::Forbidden { .. } => write!(f, "Unauthorized file path."),
            HandlerError::NotFound { name } => write!(f, "File '{name}' does not exist."),
            HandlerError::Storage { context, source } => write!(f, "{context}: {source}"),
            HandlerError::StreamRead { source } => {
                write!(f, "Failed to read request body: {source}")
            }
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Storage { source, .. } | HandlerError::StreamRead { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}
