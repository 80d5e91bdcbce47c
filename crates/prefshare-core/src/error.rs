use std::fmt;

use crate::api::ApiError;

/// Why a user-facing flow stopped.
#[derive(Debug)]
pub enum FlowError {
    /// Input rejected locally; nothing was sent.
    Invalid(String),
    /// The backend call failed.
    Api(ApiError),
    /// Local credential storage failed.
    Storage(anyhow::Error),
}

impl FlowError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FlowError::Invalid(message.into())
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Invalid(message) => write!(f, "{message}"),
            FlowError::Api(err) => write!(f, "{err}"),
            FlowError::Storage(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::Api(err) => Some(err),
            FlowError::Invalid(_) | FlowError::Storage(_) => None,
        }
    }
}

impl From<ApiError> for FlowError {
    fn from(err: ApiError) -> Self {
        FlowError::Api(err)
    }
}
