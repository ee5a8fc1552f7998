//! # Delete Endpoint
//!
//! Removes one file from the upload directory. The target comes from the
//! `filename` query parameter and must resolve, lexically, to a path strictly
//! inside the upload directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::response::{Response, Status};

/// The only method the delete endpoint accepts.
pub const DELETE_METHOD: &str = "DELETE";

/// Query parameter naming the file to delete.
pub const FILENAME_PARAM: &str = "filename";

/// Run the delete flow and turn the result into a response.
pub fn handle_delete(ctx: &RequestContext) -> Response {
    match delete_target(ctx) {
        Ok(name) => Response::text(Status::Ok, format!("File '{name}' deleted successfully.")),
        Err(err) => {
            match err.status() {
                Status::InternalError => warn!(error = %err, "delete failed"),
                _ => info!(error = %err, status = %err.status().code(), "delete rejected"),
            }
            let body = match &err {
                HandlerError::Storage { source, .. } => {
                    format!("Error: {source}. File not deleted.")
                }
                other => format!("Error: {other}"),
            };
            Response::text(err.status(), body)
        }
    }
}

/// Delete the requested file, returning the requested name on success.
pub fn delete_target(ctx: &RequestContext) -> Result<String, HandlerError> {
    if ctx.method() != DELETE_METHOD {
        return Err(HandlerError::MethodNotAllowed {
            method: ctx.method().to_string(),
            allowed: DELETE_METHOD,
        });
    }

    let name = requested_filename(ctx.query_string()).ok_or(HandlerError::MissingTarget)?;
    let target = resolve_within(ctx.upload_dir(), &name)?;

    match fs::symlink_metadata(&target) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HandlerError::NotFound { name });
        }
        Err(e) => {
            return Err(HandlerError::storage(
                format!("Error inspecting {}", target.display()),
                e,
            ))
        }
    }

    fs::remove_file(&target).map_err(|e| {
        HandlerError::storage(format!("Error deleting {}", target.display()), e)
    })?;
    info!(path = %target.display(), "file deleted");
    Ok(name)
}

/// `filename` value from a query string.
///
/// The value is form-decoded and then percent-decoded once more, so a client
/// that double-encodes its path still reaches the intended name. Empty values
/// count as absent.
pub fn requested_filename(query: &str) -> Option<String> {
    let raw = url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == FILENAME_PARAM)
        .map(|(_, v)| v.into_owned())?;
    let decoded = match urlencoding::decode(&raw) {
        Ok(s) => s.into_owned(),
        Err(_) => raw,
    };
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Join `requested` onto `root` and normalise the result lexically.
///
/// Fails with [`HandlerError::Forbidden`] unless the result is strictly
/// inside `root`. An absolute `requested` replaces `root` entirely, so it
/// only passes if it already points inside it.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, HandlerError> {
    let root = normalize_lexically(root);
    let target = normalize_lexically(&root.join(requested));
    if target.starts_with(&root) && target != root {
        Ok(target)
    } else {
        Err(HandlerError::Forbidden {
            requested: requested.to_string(),
        })
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(s) => out.push(s),
        }
    }
    out
}
