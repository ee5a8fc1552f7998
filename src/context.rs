use std::path::{Path, PathBuf};

/// Immutable facts about one CGI invocation.
///
/// Built by the driver from the CGI environment and handed to an endpoint.
/// Nothing in here changes while the request is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: String,
    declared_content_length: u64,
    upload_dir: PathBuf,
    query_string: String,
}

impl RequestContext {
    /// `upload_dir` is made absolute against the current working directory.
    pub fn new(
        method: impl Into<String>,
        declared_content_length: u64,
        upload_dir: impl AsRef<Path>,
    ) -> Self {
        let upload_dir = upload_dir.as_ref();
        let upload_dir =
            std::path::absolute(upload_dir).unwrap_or_else(|_| upload_dir.to_path_buf());
        Self {
            method: method.into(),
            declared_content_length,
            upload_dir,
            query_string: String::new(),
        }
    }

    #[must_use]
    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Byte count the client declared for the body; 0 when unknown.
    pub fn declared_content_length(&self) -> u64 {
        self.declared_content_length
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }
}

/// Lenient `CONTENT_LENGTH` parsing: absent, empty, negative or garbage is 0.
pub fn parse_content_length(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0)
}
