//! Normalized outcome of every backend call.

use std::fmt;

use serde_json::Value;

/// Failure category for a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection refused, DNS, TLS, reset
    Transport,
    /// Request exceeded the configured timeout
    Timeout,
    /// Response body was not the JSON shape we expect
    Parse,
    /// Backend answered and said no (business rule or non-2xx)
    Rejected,
    /// No stored token for a call that needs one
    MissingCredential,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Parse => write!(f, "parse"),
            ApiErrorKind::Rejected => write!(f, "rejected"),
            ApiErrorKind::MissingCredential => write!(f, "missing_credential"),
        }
    }
}

/// Structured error from the API boundary.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Raw body or underlying error text
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Maps a reqwest failure to transport or timeout.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ApiErrorKind::Timeout
        } else {
            ApiErrorKind::Transport
        };
        Self {
            kind,
            message: format!("Request failed: {err}"),
            status: err.status().map(|s| s.as_u16()),
            details: None,
        }
    }

    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: message.into(),
            status: None,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Builds a rejection, preferring the backend's own `message` field.
    pub fn rejected(status: u16, body: &Value, fallback: &str) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map_or_else(|| fallback.to_string(), str::to_string);
        Self {
            kind: ApiErrorKind::Rejected,
            message,
            status: Some(status),
            details: Some(body.to_string()),
        }
    }

    pub fn missing_credential(role: &str) -> Self {
        Self::new(
            ApiErrorKind::MissingCredential,
            format!("No {role} token available. Log in first."),
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rejected_prefers_backend_message() {
        let err = ApiError::rejected(400, &json!({"status":"fail","message":"Username taken"}), "x");
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert_eq!(err.to_string(), "Username taken");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_rejected_falls_back_when_message_blank() {
        let err = ApiError::rejected(500, &json!({"message":"  "}), "Please try again.");
        assert_eq!(err.message, "Please try again.");
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::rejected(401, &json!({}), "Unauthorized");
        assert!(err.is_unauthorized());
        assert!(!ApiError::new(ApiErrorKind::Parse, "bad").is_unauthorized());
    }
}
