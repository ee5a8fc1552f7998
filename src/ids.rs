use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Identifier attached to every log line of one CGI invocation, backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct InvocationId(pub ulid::Ulid);

impl InvocationId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse an upstream id (e.g. `HTTP_X_REQUEST_ID`) if it parses; otherwise generate one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.trim().parse::<InvocationId>().ok())
            .unwrap_or_default()
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for InvocationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InvocationId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(InvocationId(ulid::Ulid::from_string(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_valid_header() {
        let id = InvocationId::new();
        let text = id.to_string();
        assert_eq!(InvocationId::from_header_or_new(Some(&text)), id);
    }

    #[test]
    fn test_invalid_header_generates_fresh_id() {
        let a = InvocationId::from_header_or_new(Some("not-a-ulid"));
        let b = InvocationId::from_header_or_new(None);
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 26);
    }
}
